//! NSMF compiler - turns document text into a [`ParsedScore`]
//!
//! The document is tokenized once, then the global config is read, loops
//! are unrolled and the token stream is cut into channels.

pub mod channel;
pub mod note;
pub mod token;

use crate::error::{Error, Result};
use channel::{Channel, ChannelConfig};
use note::Note;
use token::Token;
use tracing::debug;

/// Document-wide settings from `globalconfig ... endglobalconfig`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GlobalConfig {
    /// Tempo in percent of the written durations' speed
    pub tempo_percent: u32,
}

impl GlobalConfig {
    /// Factor applied to every raw note duration
    pub fn duration_multiplier(&self) -> f64 {
        100.0 / self.tempo_percent as f64
    }
}

/// Fully parsed and validated document
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedScore {
    pub global: GlobalConfig,
    pub channels: Vec<Channel>,
}

impl ParsedScore {
    /// Parse a complete NSMF document
    pub fn parse(source: &str) -> Result<Self> {
        let tokens = token::tokenize(source)?;
        let (global, body) = parse_global_config(&tokens)?;
        let expanded = expand_loops(body)?;
        let segments = split_channels(&expanded)?;

        let multiplier = global.duration_multiplier();
        let mut channels = Vec::with_capacity(segments.len());
        for (index, segment) in segments.into_iter().enumerate() {
            let channel = build_channel(index, segment, multiplier)?;
            debug!(
                channel = index,
                instrument = channel.config.instrument.name(),
                notes = channel.notes.len(),
                duration_ms = channel.duration_ms,
                "parsed channel"
            );
            channels.push(channel);
        }

        Ok(Self { global, channels })
    }

    /// Total duration of each channel, in document order
    pub fn channel_durations(&self) -> Vec<u64> {
        self.channels.iter().map(|c| c.duration_ms).collect()
    }

    /// Duration of the longest channel
    pub fn longest_duration_ms(&self) -> u64 {
        self.channels
            .iter()
            .map(|c| c.duration_ms)
            .max()
            .unwrap_or(0)
    }
}

/// Read `globalconfig tempo <N>% endglobalconfig`, returning the remaining tokens
fn parse_global_config<'t, 'a>(tokens: &'t [Token<'a>]) -> Result<(GlobalConfig, &'t [Token<'a>])> {
    let start = tokens.first().map(|t| t.line).unwrap_or(2);
    if !tokens.first().is_some_and(|t| t.is("globalconfig")) {
        return Err(Error::malformed(start, "Expected globalconfig."));
    }

    let end = tokens
        .iter()
        .position(|t| t.is("endglobalconfig"))
        .ok_or_else(|| Error::malformed(start, "globalconfig without endglobalconfig."))?;

    let mut tempo = None;
    let mut iter = tokens[1..end].iter();
    while let Some(t) = iter.next() {
        match t.text {
            "tempo" => {
                let value = iter
                    .next()
                    .ok_or_else(|| Error::malformed(t.line, "tempo requires a value."))?;
                tempo = Some(parse_tempo(value)?);
            }
            other => {
                return Err(Error::malformed(
                    t.line,
                    format!("Unknown global setting \"{}\".", other),
                ));
            }
        }
    }

    let tempo_percent =
        tempo.ok_or_else(|| Error::malformed(start, "globalconfig has no tempo."))?;

    Ok((GlobalConfig { tempo_percent }, &tokens[end + 1..]))
}

fn parse_tempo(token: &Token<'_>) -> Result<u32> {
    token
        .text
        .strip_suffix('%')
        .and_then(|n| n.parse::<u32>().ok())
        .filter(|&n| n > 0)
        .ok_or_else(|| {
            Error::malformed(
                token.line,
                format!("\"{}\" is an invalid tempo value.", token.text),
            )
        })
}

/// Replace each `loop <count> ... endloop` with `count` copies of its body
pub fn expand_loops<'a>(tokens: &[Token<'a>]) -> Result<Vec<Token<'a>>> {
    let mut out = Vec::with_capacity(tokens.len());
    let mut iter = tokens.iter();

    while let Some(&t) = iter.next() {
        match t.text {
            "loop" => {
                let mut body = Vec::new();
                loop {
                    match iter.next() {
                        None => {
                            return Err(Error::malformed(t.line, "loop without endloop."));
                        }
                        Some(inner) if inner.is("endloop") => break,
                        Some(inner) if inner.is("loop") => {
                            return Err(Error::UnsupportedConstruct {
                                line: inner.line,
                                message: "Nested loops are not allowed.".to_string(),
                            });
                        }
                        Some(&inner) => body.push(inner),
                    }
                }

                let (count, notes) = body.split_first().ok_or_else(|| Error::InvalidArgument {
                    line: t.line,
                    message: "loop requires a repeat count.".to_string(),
                })?;
                let repeat: usize = count.text.parse().map_err(|_| Error::InvalidArgument {
                    line: count.line,
                    message: format!("\"{}\" is not a valid repeat count.", count.text),
                })?;
                if repeat < 2 {
                    return Err(Error::InvalidArgument {
                        line: count.line,
                        message: "Looping less than 2 times is not allowed.".to_string(),
                    });
                }

                for _ in 0..repeat {
                    out.extend_from_slice(notes);
                }
            }
            "endloop" => return Err(Error::malformed(t.line, "endloop without loop.")),
            _ => out.push(t),
        }
    }

    Ok(out)
}

/// Raw tokens of one channel block
#[derive(Debug)]
struct Segment<'t, 'a> {
    config: &'t [Token<'a>],
    notes: Vec<Token<'a>>,
}

/// Cut the stream at every `endchannel` and pull out each `config` block
fn split_channels<'t, 'a>(tokens: &'t [Token<'a>]) -> Result<Vec<Segment<'t, 'a>>> {
    let mut segments = Vec::new();
    let mut rest = tokens;

    while let Some(end) = rest.iter().position(|t| t.is("endchannel")) {
        let mut block = &rest[..end];
        rest = &rest[end + 1..];

        if block.first().is_some_and(|t| t.is("channel")) {
            block = &block[1..];
        }

        // Only the first line of a channel may follow a large gap
        if let Some(t) = block.iter().skip(1).find(|t| t.blank_lines > 1) {
            return Err(Error::MisalignedChannels {
                line: t.line,
                blank_lines: t.blank_lines,
            });
        }

        let segment = match block.iter().position(|t| t.is("config")) {
            Some(open) => {
                let close = block[open..]
                    .iter()
                    .position(|t| t.is("endconfig"))
                    .map(|p| open + p)
                    .ok_or_else(|| {
                        Error::malformed(block[open].line, "config without endconfig.")
                    })?;
                let mut notes = block[..open].to_vec();
                notes.extend_from_slice(&block[close + 1..]);
                Segment {
                    config: &block[open + 1..close],
                    notes,
                }
            }
            None => Segment {
                config: &[],
                notes: block.to_vec(),
            },
        };
        segments.push(segment);
    }

    if let Some(t) = rest.first() {
        return Err(Error::malformed(t.line, "Content after the last endchannel."));
    }
    if segments.is_empty() {
        let line = tokens.last().map(|t| t.line).unwrap_or(2);
        return Err(Error::malformed(line, "The document has no channels."));
    }

    Ok(segments)
}

fn build_channel(index: usize, segment: Segment<'_, '_>, multiplier: f64) -> Result<Channel> {
    let words: Vec<&str> = segment.config.iter().map(|t| t.text).collect();
    let config = ChannelConfig::parse(&words)?;

    let mut channel = Channel::new(index, config);
    for token in &segment.notes {
        channel.push(Note::parse(token, multiplier)?)?;
    }
    Ok(channel)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn toks(s: &str) -> Vec<Token<'_>> {
        s.split_whitespace().map(|w| Token::new(w, 1)).collect()
    }

    fn texts<'a>(tokens: &[Token<'a>]) -> Vec<&'a str> {
        tokens.iter().map(|t| t.text).collect()
    }

    #[test]
    fn test_expand_loop() {
        let out = expand_loops(&toks("x,1 loop 3 a,100 b,100 endloop y,1")).unwrap();
        assert_eq!(
            texts(&out),
            vec!["x,1", "a,100", "b,100", "a,100", "b,100", "a,100", "b,100", "y,1"]
        );
    }

    #[test]
    fn test_expand_several_loops() {
        let out = expand_loops(&toks("loop 2 a,1 endloop loop 2 b,1 c,1 endloop")).unwrap();
        assert_eq!(texts(&out), vec!["a,1", "a,1", "b,1", "c,1", "b,1", "c,1"]);
    }

    #[test]
    fn test_loop_count_too_small() {
        for count in ["0", "1", "-4", "two"] {
            let src = format!("loop {} a,100 endloop", count);
            let err = expand_loops(&toks(&src)).unwrap_err();
            assert!(matches!(err, Error::InvalidArgument { .. }), "count {}", count);
        }
        let err = expand_loops(&toks("loop endloop")).unwrap_err();
        assert!(matches!(err, Error::InvalidArgument { .. }));
    }

    #[test]
    fn test_nested_loop() {
        let err = expand_loops(&toks("loop 2 loop 2 a,1 endloop endloop")).unwrap_err();
        assert!(matches!(err, Error::UnsupportedConstruct { .. }));
    }

    #[test]
    fn test_unbalanced_loop() {
        let err = expand_loops(&toks("loop 2 a,1")).unwrap_err();
        assert!(matches!(err, Error::MalformedDocument { .. }));
        let err = expand_loops(&toks("a,1 endloop")).unwrap_err();
        assert!(matches!(err, Error::MalformedDocument { .. }));
    }

    #[test]
    fn test_global_config() {
        let tokens = toks("globalconfig tempo 200% endglobalconfig channel");
        let (global, rest) = parse_global_config(&tokens).unwrap();
        assert_eq!(global.tempo_percent, 200);
        assert_eq!(global.duration_multiplier(), 0.5);
        assert_eq!(texts(rest), vec!["channel"]);

        let tokens = toks("globalconfig tempo 50% endglobalconfig");
        assert_eq!(parse_global_config(&tokens).unwrap().0.duration_multiplier(), 2.0);
    }

    #[test]
    fn test_global_config_errors() {
        for src in [
            "globalconfig endglobalconfig",
            "globalconfig tempo endglobalconfig",
            "globalconfig tempo fast% endglobalconfig",
            "globalconfig tempo 0% endglobalconfig",
            "globalconfig tempo 100 endglobalconfig",
            "globalconfig tempo 100%",
            "globalconfig volume 3 endglobalconfig",
        ] {
            let tokens = toks(src);
            let err = parse_global_config(&tokens).unwrap_err();
            assert!(matches!(err, Error::MalformedDocument { .. }), "{}", src);
        }
    }

    #[test]
    fn test_split_channels() {
        let tokens = toks(
            "channel config 1 0 default sinwave endconfig a,1 b,1 endchannel \
             channel config 2 0 default drum endconfig c,1 endchannel",
        );
        let segments = split_channels(&tokens).unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(texts(segments[0].config), vec!["1", "0", "default", "sinwave"]);
        assert_eq!(texts(&segments[0].notes), vec!["a,1", "b,1"]);
        assert_eq!(texts(&segments[1].notes), vec!["c,1"]);
    }

    #[test]
    fn test_split_channels_missing_config() {
        let tokens = toks("channel a,1 endchannel");
        let segments = split_channels(&tokens).unwrap();
        assert!(segments[0].config.is_empty());
        let err = build_channel(0, split_channels(&tokens).unwrap().remove(0), 1.0).unwrap_err();
        assert!(matches!(err, Error::InvalidConfigValue { field: "volume", .. }));
    }

    #[test]
    fn test_split_channels_trailing_content() {
        let tokens = toks("channel config 1 0 default sinwave endconfig endchannel a,1");
        let err = split_channels(&tokens).unwrap_err();
        assert!(matches!(err, Error::MalformedDocument { .. }));

        let err = split_channels(&[]).unwrap_err();
        assert!(matches!(err, Error::MalformedDocument { .. }));
    }

    #[test]
    fn test_channel_gap() {
        let mut tokens = toks("channel config 1 0 default sinwave endconfig a,1 b,1 endchannel");
        tokens[0].blank_lines = 5;
        assert!(split_channels(&tokens).is_ok());

        tokens[7].blank_lines = 1;
        assert!(split_channels(&tokens).is_ok());

        tokens[7].blank_lines = 2;
        let err = split_channels(&tokens).unwrap_err();
        assert!(matches!(err, Error::MisalignedChannels { blank_lines: 2, .. }));
    }

    #[test]
    fn test_parse_score() {
        let doc = "#META filetype nsmf\n\
                   globalconfig tempo 200% endglobalconfig\n\
                   channel config volume=50 transpos=0 samplerate=8kHz instrument=sqwave endconfig\n\
                   A4,500 loop 2 pause,100 endloop\n\
                   endchannel\n";
        let score = ParsedScore::parse(doc).unwrap();
        assert_eq!(score.global.tempo_percent, 200);
        assert_eq!(score.channels.len(), 1);
        let ch = &score.channels[0];
        assert_eq!(ch.config.sample_rate, 8192);
        assert_eq!(ch.notes.len(), 3);
        assert_eq!(ch.notes[0].duration_ms, 250);
        assert_eq!(ch.duration_ms, 350);
        assert_eq!(score.channel_durations(), vec![350]);
        assert_eq!(score.longest_duration_ms(), 350);
    }
}
