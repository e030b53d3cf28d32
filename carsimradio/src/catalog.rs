//! Station and song catalog.
//!
//! Loaded once at startup and never modified. Station ids are positions
//! in the catalog, so every id below `len()` is valid.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::RadioError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SongInfo {
    pub artist: String,
    pub title: String,
    #[serde(default)]
    pub year: u32,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationInfo {
    #[serde(default)]
    pub id: u32,
    pub name: String,
    pub songs: Vec<SongInfo>,
}

#[derive(Debug, Deserialize)]
struct CatalogFile {
    stations: Vec<StationInfo>,
}

#[derive(Clone, Debug)]
pub struct Catalog {
    stations: Vec<StationInfo>,
}

fn song(artist: &str, title: &str, year: u32) -> SongInfo {
    SongInfo {
        artist: artist.to_string(),
        title: title.to_string(),
        year,
    }
}

fn station(name: &str, songs: Vec<SongInfo>) -> StationInfo {
    StationInfo {
        id: 0,
        name: name.to_string(),
        songs,
    }
}

impl Catalog {
    /// Builds a catalog, numbering stations by position.
    pub fn new(stations: Vec<StationInfo>) -> Result<Self, RadioError> {
        if stations.is_empty() {
            return Err(RadioError::EmptyCatalog);
        }
        if let Some(empty) = stations.iter().find(|s| s.songs.is_empty()) {
            return Err(RadioError::EmptyStation(empty.name.clone()));
        }

        let stations = stations
            .into_iter()
            .enumerate()
            .map(|(idx, mut station)| {
                station.id = idx as u32;
                station
            })
            .collect();

        Ok(Self { stations })
    }

    /// Catalog shipped with the radio. Station 0 carries exactly two songs.
    pub fn builtin() -> Self {
        let stations = vec![
            station(
                "Radio Baroque",
                vec![
                    song("Johann Sebastian Bach", "Air on the G String", 1731),
                    song("Antonio Vivaldi", "Spring", 1725),
                ],
            ),
            station(
                "Romantic FM",
                vec![
                    song("Frederic Chopin", "Nocturne in E-flat major", 1832),
                    song("Franz Schubert", "Ave Maria", 1825),
                    song("Robert Schumann", "Traumerei", 1838),
                    song("Franz Liszt", "Liebestraum No. 3", 1850),
                ],
            ),
            station(
                "Opera Night",
                vec![
                    song("Giuseppe Verdi", "La donna e mobile", 1851),
                    song("Giacomo Puccini", "O mio babbino caro", 1918),
                    song("Georges Bizet", "Habanera", 1875),
                ],
            ),
            station(
                "Ragtime Drive",
                vec![
                    song("Scott Joplin", "The Entertainer", 1902),
                    song("Scott Joplin", "Maple Leaf Rag", 1899),
                    song("James Scott", "Frog Legs Rag", 1906),
                ],
            ),
        ];

        Self { stations }.renumbered()
    }

    fn renumbered(mut self) -> Self {
        for (idx, station) in self.stations.iter_mut().enumerate() {
            station.id = idx as u32;
        }
        self
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, RadioError> {
        let file: CatalogFile =
            serde_yaml::from_str(yaml).map_err(|e| RadioError::CatalogParse(e.to_string()))?;
        Self::new(file.stations)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, RadioError> {
        let path = path.as_ref();
        let yaml = fs::read_to_string(path)
            .map_err(|e| RadioError::CatalogRead(path.display().to_string(), e.to_string()))?;
        Self::from_yaml_str(&yaml)
    }

    /// Number of stations. Never zero.
    pub fn len(&self) -> u32 {
        self.stations.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    pub fn station(&self, id: u32) -> Option<&StationInfo> {
        self.stations.get(id as usize)
    }

    pub fn stations(&self) -> &[StationInfo] {
        &self.stations
    }
}
