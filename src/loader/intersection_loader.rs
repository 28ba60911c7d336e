//! Reads the tab-separated intersection description format and assembles an
//! [`Intersection`] from it.
//!
//! ```text
//! <Intersection>
//! name    description
//! </Intersection>
//! <TrafficStreams>
//! name    description
//! </TrafficStreams>
//! <PhasePlan>                       (or <PhasePlanActuated>)
//! <Phases>
//! name    description    GGRRX    10
//! </Phases>
//! </PhasePlan>
//! <SignalFaces>
//! SW    N    STANDARD    streamName
//! </SignalFaces>
//! ```
//!
//! Blank lines and `//` comment lines are skipped. Each state string holds one
//! `G`/`Y`/`R`/`X` per stream, in stream declaration order.

use crate::error::AssemblyError;
use crate::global_variables::DEFAULT_DETECTOR_PROBABILITY;
use crate::simulation_engine::detectors::{DetectorHandle, RandomDetector};
use crate::simulation_engine::intersections::Intersection;
use crate::simulation_engine::phase_plans::PlanPolicy;
use crate::simulation_engine::phases::Phase;
use crate::simulation_engine::signals::{FaceType, ParseSignalError, State, TrafficDirection};
use crate::simulation_engine::streams::StreamId;
use log::{debug, info};
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

const INTERSECTION: &str = "<Intersection>";
const END_INTERSECTION: &str = "</Intersection>";
const TRAFFIC_STREAMS: &str = "<TrafficStreams>";
const END_TRAFFIC_STREAMS: &str = "</TrafficStreams>";
const PHASEPLAN: &str = "<PhasePlan>";
const PHASEPLAN_ACTUATED: &str = "<PhasePlanActuated>";
const END_PHASEPLAN: &str = "</PhasePlan>";
const PHASES: &str = "<Phases>";
const END_PHASES: &str = "</Phases>";
const SIGNAL_FACES: &str = "<SignalFaces>";
const END_SIGNAL_FACES: &str = "</SignalFaces>";

/// Part of the description file being read when an error occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    Intersection,
    TrafficStreams,
    PhasePlan,
    Phases,
    SignalFaces,
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let name = match self {
            Section::Intersection => "intersection description",
            Section::TrafficStreams => "traffic streams",
            Section::PhasePlan => "phase plans",
            Section::Phases => "phases",
            Section::SignalFaces => "signal faces",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("could not read intersection description: {0}")]
    Read(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("error in format of {section} at line {line}: {message}")]
    Syntax {
        section: Section,
        line: u64,
        message: String,
    },

    #[error("end of file before {0} complete")]
    UnexpectedEof(Section),

    #[error("invalid intersection: {0}")]
    Assembly(#[from] AssemblyError),
}

/// Parses the whole-seconds duration column of a phase line.
pub fn parse_seconds(text: &str) -> Result<u64, ParseSignalError> {
    if text.is_empty() || !text.chars().all(|c| c.is_ascii_digit()) {
        return Err(ParseSignalError::Seconds(text.to_string()));
    }
    text.parse()
        .map_err(|_| ParseSignalError::Seconds(text.to_string()))
}

/// Parses the first `count` characters of a phase's state column.
pub fn parse_states(codes: &str, count: usize) -> Result<Vec<State>, ParseSignalError> {
    codes.chars().take(count).map(State::from_code).collect()
}

struct Line {
    number: u64,
    fields: Vec<String>,
}

impl Line {
    fn is_tag(&self, tag: &str) -> bool {
        self.fields.len() == 1 && self.fields[0] == tag
    }

    fn syntax(&self, section: Section, message: impl fmt::Display) -> LoadError {
        LoadError::Syntax {
            section,
            line: self.number,
            message: message.to_string(),
        }
    }
}

struct Lines {
    lines: Vec<Line>,
    pos: usize,
}

impl Lines {
    fn read<R: Read>(input: R) -> Result<Self, LoadError> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .flexible(true)
            .quoting(false)
            .trim(csv::Trim::All)
            .from_reader(input);

        let mut lines = Vec::new();
        for result in reader.records() {
            let record = result?;
            if record.iter().all(|field| field.is_empty())
                || record.get(0).is_some_and(|first| first.starts_with("//"))
            {
                continue;
            }
            lines.push(Line {
                number: record.position().map(|p| p.line()).unwrap_or(0),
                fields: record.iter().map(str::to_string).collect(),
            });
        }
        Ok(Self { lines, pos: 0 })
    }

    fn next(&mut self, section: Section) -> Result<&Line, LoadError> {
        let line = self
            .lines
            .get(self.pos)
            .ok_or(LoadError::UnexpectedEof(section))?;
        self.pos += 1;
        Ok(line)
    }

    fn expect_tag(&mut self, section: Section, tag: &str) -> Result<(), LoadError> {
        let line = self.next(section)?;
        if !line.is_tag(tag) {
            return Err(line.syntax(section, format!("missing {} tag", tag)));
        }
        Ok(())
    }
}

type DetectorFactory = Box<dyn FnMut(&str) -> DetectorHandle + Send>;

/// Builds intersections from description files.
///
/// Actuated plans need a detector per stream; by default each stream gets a
/// [`RandomDetector`], but callers can supply their own.
pub struct IntersectionLoader {
    detector_factory: DetectorFactory,
}

impl Default for IntersectionLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl IntersectionLoader {
    pub fn new() -> Self {
        Self::with_detector_factory(|_| Arc::new(RandomDetector::new(DEFAULT_DETECTOR_PROBABILITY)))
    }

    /// `factory` is called once per stream (with the stream name) when the
    /// file declares an actuated plan.
    pub fn with_detector_factory(
        factory: impl FnMut(&str) -> DetectorHandle + Send + 'static,
    ) -> Self {
        Self {
            detector_factory: Box::new(factory),
        }
    }

    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Result<Intersection, LoadError> {
        let file = File::open(path.as_ref())?;
        info!("Loading intersection from {}", path.as_ref().display());
        self.load(file)
    }

    pub fn load_str(&mut self, text: &str) -> Result<Intersection, LoadError> {
        self.load(text.as_bytes())
    }

    pub fn load<R: Read>(&mut self, input: R) -> Result<Intersection, LoadError> {
        let mut lines = Lines::read(input)?;

        let mut intersection = read_intersection(&mut lines)?;
        let streams = read_traffic_streams(&mut lines, &mut intersection)?;
        self.read_phase_plans(&mut lines, &mut intersection, &streams)?;
        read_signal_faces(&mut lines, &mut intersection)?;

        info!(
            "Loaded intersection '{}': {} streams, {} plans, {} signal faces",
            intersection.name(),
            intersection.streams().len(),
            intersection.plans().len(),
            intersection.faces().len()
        );
        Ok(intersection)
    }

    fn read_phase_plans(
        &mut self,
        lines: &mut Lines,
        intersection: &mut Intersection,
        streams: &[StreamId],
    ) -> Result<(), LoadError> {
        let section = Section::PhasePlan;
        let line = lines.next(section)?;
        let policy = if line.is_tag(PHASEPLAN) {
            PlanPolicy::Pretimed
        } else if line.is_tag(PHASEPLAN_ACTUATED) {
            PlanPolicy::FullyActuated
        } else {
            return Err(line.syntax(section, "missing PhasePlan tag"));
        };

        let detectors: Vec<Option<DetectorHandle>> = match policy {
            PlanPolicy::Pretimed => vec![None; streams.len()],
            PlanPolicy::FullyActuated => {
                let mut detectors = Vec::with_capacity(streams.len());
                for &stream in streams {
                    let name = intersection
                        .stream(stream)
                        .map(|s| s.name().to_string())
                        .unwrap_or_default();
                    let detector = (self.detector_factory)(&name);
                    intersection.add_detector(stream, Arc::clone(&detector))?;
                    detectors.push(Some(detector));
                }
                detectors
            }
        };

        let mut plans = 0;
        loop {
            let line = lines.next(section)?;
            if line.is_tag(END_PHASEPLAN) {
                break;
            }
            if !line.is_tag(PHASES) {
                return Err(line.syntax(section, "expected <Phases> block"));
            }
            plans += 1;
            let mut plan = intersection.new_plan(format!("Plan {}", plans), policy);
            loop {
                let line = lines.next(Section::Phases)?;
                if line.is_tag(END_PHASES) {
                    break;
                }
                plan.add(parse_phase(line, streams, &detectors)?)?;
            }
            debug!("Read plan '{}' with {} phases", plan.name(), plan.len());
            intersection.add_plan(plan)?;
        }

        if plans == 0 {
            return Err(LoadError::Syntax {
                section,
                line: lines.lines.get(lines.pos - 1).map(|l| l.number).unwrap_or(0),
                message: "invalid phase plan description: no <Phases> block".to_string(),
            });
        }
        Ok(())
    }
}

fn read_intersection(lines: &mut Lines) -> Result<Intersection, LoadError> {
    let section = Section::Intersection;
    lines.expect_tag(section, INTERSECTION)?;
    let line = lines.next(section)?;
    if line.fields.len() < 2 {
        return Err(line.syntax(section, "missing intersection title or description"));
    }
    let intersection = Intersection::new(line.fields[0].as_str(), line.fields[1].as_str());
    lines.expect_tag(section, END_INTERSECTION)?;
    Ok(intersection)
}

fn read_traffic_streams(
    lines: &mut Lines,
    intersection: &mut Intersection,
) -> Result<Vec<StreamId>, LoadError> {
    let section = Section::TrafficStreams;
    lines.expect_tag(section, TRAFFIC_STREAMS)?;
    let mut streams = Vec::new();
    loop {
        let line = lines.next(section)?;
        if line.is_tag(END_TRAFFIC_STREAMS) {
            break;
        }
        if line.fields.len() < 2 {
            return Err(line.syntax(section, "invalid traffic stream description"));
        }
        streams.push(intersection.add_stream(line.fields[0].as_str(), line.fields[1].as_str())?);
    }
    Ok(streams)
}

fn parse_phase(
    line: &Line,
    streams: &[StreamId],
    detectors: &[Option<DetectorHandle>],
) -> Result<Phase, LoadError> {
    let section = Section::Phases;
    if line.fields.len() < 4 {
        return Err(line.syntax(section, "insufficient phase word length"));
    }
    let codes = &line.fields[2];
    if codes.chars().count() < streams.len() {
        return Err(line.syntax(section, "insufficient signal colours"));
    }
    let states = parse_states(codes, streams.len()).map_err(|e| line.syntax(section, e))?;
    let seconds = parse_seconds(&line.fields[3]).map_err(|e| line.syntax(section, e))?;

    let mut phase = Phase::new(line.fields[0].as_str(), line.fields[1].as_str());
    for ((&stream, state), detector) in streams.iter().zip(states).zip(detectors) {
        match detector {
            Some(detector) => phase.add_stream_with_detector(stream, state, Arc::clone(detector)),
            None => phase.add_stream(stream, state),
        };
    }
    phase.set_min_green_interval(seconds as f64)?;
    Ok(phase)
}

fn read_signal_faces(lines: &mut Lines, intersection: &mut Intersection) -> Result<(), LoadError> {
    let section = Section::SignalFaces;
    lines.expect_tag(section, SIGNAL_FACES)?;
    loop {
        let line = lines.next(section)?;
        if line.is_tag(END_SIGNAL_FACES) {
            break;
        }
        if line.fields.len() < 4 {
            return Err(line.syntax(section, "insufficient words in SignalFace description"));
        }
        let location: TrafficDirection = line.fields[0]
            .parse()
            .map_err(|e| line.syntax(section, format!("invalid location: {}", e)))?;
        let facing: TrafficDirection = line.fields[1]
            .parse()
            .map_err(|e| line.syntax(section, format!("invalid facing: {}", e)))?;
        let face_type: FaceType = line.fields[2]
            .parse()
            .map_err(|e| line.syntax(section, e))?;
        let stream = intersection
            .stream_by_name(&line.fields[3])
            .map(|s| s.id())
            .ok_or_else(|| line.syntax(section, "stream assigned to face does not exist"))?;

        let face = intersection.add_signal_face(location, facing, face_type)?;
        intersection.subscribe(face, stream)?;
    }
    Ok(())
}
