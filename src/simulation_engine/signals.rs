use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// The color a traffic stream (and every face watching it) is showing.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum State {
    Green,
    Yellow,
    #[default]
    Red,
    Off,
}

impl State {
    /// Parses the single-letter code used in intersection descriptions
    /// (`G`, `Y`, `R`, and `X` for a dark signal).
    pub fn from_code(code: char) -> Result<Self, ParseSignalError> {
        match code {
            'G' => Ok(State::Green),
            'Y' => Ok(State::Yellow),
            'R' => Ok(State::Red),
            'X' => Ok(State::Off),
            other => Err(ParseSignalError::StateCode(other)),
        }
    }

    pub fn code(self) -> char {
        match self {
            State::Green => 'G',
            State::Yellow => 'Y',
            State::Red => 'R',
            State::Off => 'X',
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            State::Green => write!(f, "GREEN"),
            State::Yellow => write!(f, "YELLOW"),
            State::Red => write!(f, "RED"),
            State::Off => write!(f, "OFF"),
        }
    }
}

/// Compass points used to place and orient signal faces around the junction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrafficDirection {
    North,
    NorthEast,
    East,
    SouthEast,
    South,
    SouthWest,
    West,
    NorthWest,
}

impl TrafficDirection {
    pub fn abbreviation(self) -> &'static str {
        match self {
            TrafficDirection::North => "N",
            TrafficDirection::NorthEast => "NE",
            TrafficDirection::East => "E",
            TrafficDirection::SouthEast => "SE",
            TrafficDirection::South => "S",
            TrafficDirection::SouthWest => "SW",
            TrafficDirection::West => "W",
            TrafficDirection::NorthWest => "NW",
        }
    }
}

impl FromStr for TrafficDirection {
    type Err = ParseSignalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "N" => Ok(TrafficDirection::North),
            "NE" => Ok(TrafficDirection::NorthEast),
            "E" => Ok(TrafficDirection::East),
            "SE" => Ok(TrafficDirection::SouthEast),
            "S" => Ok(TrafficDirection::South),
            "SW" => Ok(TrafficDirection::SouthWest),
            "W" => Ok(TrafficDirection::West),
            "NW" => Ok(TrafficDirection::NorthWest),
            other => Err(ParseSignalError::Direction(other.to_string())),
        }
    }
}

impl fmt::Display for TrafficDirection {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.abbreviation())
    }
}

/// Shape of the lamp unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FaceType {
    Standard,
    LeftArrow,
    RightArrow,
}

impl FromStr for FaceType {
    type Err = ParseSignalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "STANDARD" => Ok(FaceType::Standard),
            "LEFT_ARROW" => Ok(FaceType::LeftArrow),
            "RIGHT_ARROW" => Ok(FaceType::RightArrow),
            other => Err(ParseSignalError::FaceType(other.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseSignalError {
    #[error("invalid signal colour token '{0}'")]
    StateCode(char),
    #[error("invalid direction '{0}'")]
    Direction(String),
    #[error("invalid shape '{0}'")]
    FaceType(String),
    #[error("delay time must be a whole number of seconds, got '{0}'")]
    Seconds(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_codes_parse() {
        assert_eq!(State::from_code('G'), Ok(State::Green));
        assert_eq!(State::from_code('Y'), Ok(State::Yellow));
        assert_eq!(State::from_code('R'), Ok(State::Red));
        assert_eq!(State::from_code('X'), Ok(State::Off));
        assert_eq!(State::from_code('g'), Err(ParseSignalError::StateCode('g')));
    }

    #[test]
    fn face_types_parse() {
        assert_eq!("STANDARD".parse::<FaceType>(), Ok(FaceType::Standard));
        assert_eq!("LEFT_ARROW".parse::<FaceType>(), Ok(FaceType::LeftArrow));
        assert_eq!("RIGHT_ARROW".parse::<FaceType>(), Ok(FaceType::RightArrow));
        assert!("UP_ARROW".parse::<FaceType>().is_err());
    }

    #[test]
    fn every_direction_round_trips_through_its_abbreviation() {
        let all = [
            TrafficDirection::North,
            TrafficDirection::NorthEast,
            TrafficDirection::East,
            TrafficDirection::SouthEast,
            TrafficDirection::South,
            TrafficDirection::SouthWest,
            TrafficDirection::West,
            TrafficDirection::NorthWest,
        ];
        for direction in all {
            assert_eq!(direction.abbreviation().parse::<TrafficDirection>(), Ok(direction));
        }
        assert!("NNE".parse::<TrafficDirection>().is_err());
    }

    #[test]
    fn states_serialize_in_upper_case() {
        assert_eq!(serde_json::to_string(&State::Off).unwrap(), "\"OFF\"");
        assert_eq!(
            serde_json::to_string(&FaceType::LeftArrow).unwrap(),
            "\"LEFT_ARROW\""
        );
    }
}
