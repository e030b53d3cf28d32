//! Bus request handler of the radio service.

use carsimbus::ids::radio;
use carsimbus::{BusError, Payload, Request};
use tracing::{debug, trace};

use crate::control::RadioControl;

fn method_name(method: u16) -> &'static str {
    match method {
        radio::IS_PLAYING => "is_playing",
        radio::SET_PLAYING => "set_playing",
        radio::GET_VOLUME => "get_volume",
        radio::CHANGE_VOLUME => "change_volume",
        radio::SWITCH_STATION => "switch_station",
        _ => "unknown",
    }
}

fn log_request(verbose: bool, request: &Request) {
    let method = method_name(request.method);
    let client = format!("{:04x}/{:04x}", request.client.0, request.session);
    if verbose {
        debug!(method, client = %client, payload = ?request.payload, "Received request");
    } else {
        trace!(method, client = %client, payload = ?request.payload, "Received request");
    }
}

/// Decodes a radio request, runs the matching command handler and encodes
/// the response.
pub fn handle_request(
    control: &RadioControl,
    verbose: bool,
    request: &Request,
) -> Result<Payload, BusError> {
    log_request(verbose, request);

    match request.method {
        radio::IS_PLAYING => Ok(Payload::from_bool(control.is_playing())),
        radio::SET_PLAYING => {
            let was_playing = control.set_playing(request.payload.as_bool());
            Ok(Payload::from_bool(was_playing))
        }
        radio::GET_VOLUME => Ok(Payload::from_u32(control.get_volume())),
        radio::CHANGE_VOLUME => {
            let volume = control.change_volume(request.payload.as_i32());
            Ok(Payload::from_u32(volume))
        }
        radio::SWITCH_STATION => {
            control.switch_station();
            Ok(Payload::from_u32(0))
        }
        other => Err(BusError::unknown_method(request.service, other)),
    }
}
