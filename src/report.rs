//! JSON summary of a parsed (and optionally rendered) score

use crate::compiler::ParsedScore;
use crate::render::RenderedScore;
use serde::Serialize;

/// Top-level summary
#[derive(Debug, Clone, Serialize)]
pub struct ScoreSummary {
    pub tempo_percent: u32,
    pub duration_multiplier: f64,
    /// Longest channel duration in milliseconds
    pub duration_ms: u64,
    pub channels: Vec<ChannelSummary>,
}

/// Per-channel summary
#[derive(Debug, Clone, Serialize)]
pub struct ChannelSummary {
    pub index: usize,
    pub instrument: &'static str,
    pub volume: f64,
    pub transpose: i32,
    pub sample_rate: u32,
    pub notes: usize,
    pub duration_ms: u64,
    /// Number of rendered samples (if rendered)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub samples: Option<usize>,
}

impl ScoreSummary {
    pub fn new(score: &ParsedScore) -> Self {
        let channels = score
            .channels
            .iter()
            .map(|c| ChannelSummary {
                index: c.index,
                instrument: c.config.instrument.name(),
                volume: c.config.volume,
                transpose: c.config.transpose,
                sample_rate: c.config.sample_rate,
                notes: c.notes.len(),
                duration_ms: c.duration_ms,
                samples: None,
            })
            .collect();

        Self {
            tempo_percent: score.global.tempo_percent,
            duration_multiplier: score.global.duration_multiplier(),
            duration_ms: score.longest_duration_ms(),
            channels,
        }
    }

    /// Fill in sample counts from a render of the same score
    pub fn with_rendered(mut self, rendered: &RenderedScore) -> Self {
        for summary in &mut self.channels {
            summary.samples = rendered
                .channels
                .iter()
                .find(|c| c.index == summary.index)
                .map(|c| c.samples.len());
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::render;

    const DOC: &str = "#META filetype nsmf
globalconfig tempo 100% endglobalconfig
channel config volume=25 transpos=-2 samplerate=8000Hz instrument=flute endconfig
C4,100 D4,100
endchannel
";

    #[test]
    fn test_summary_json() {
        let score = ParsedScore::parse(DOC).unwrap();
        let summary = ScoreSummary::new(&score);
        let json = serde_json::to_value(&summary).unwrap();
        assert_eq!(json["tempo_percent"], 100);
        assert_eq!(json["duration_ms"], 200);
        assert_eq!(json["channels"][0]["instrument"], "flute");
        assert_eq!(json["channels"][0]["transpose"], -2);
        assert!(json["channels"][0].get("samples").is_none());

        let rendered = render(&score).unwrap();
        let json = serde_json::to_value(summary.with_rendered(&rendered)).unwrap();
        assert_eq!(json["channels"][0]["samples"], 1600);
    }
}
