use std::fmt::Write as _;
use std::str::FromStr;

use glam::Vec3;

use crate::player::Pose;

pub const PROTOCOL_VERSION: &str = "0.1";
pub const DEFAULT_PORT: u16 = 27015;

const TAG_HELLO: &str = "HELLO";
const TAG_INPUT: &str = "INPUT";
const TAG_CMD: &str = "CMD";
const TAG_WELCOME: &str = "WELCOME";
const TAG_STATE: &str = "STATE";
const TAG_HIST: &str = "HIST";
const TAG_LINE: &str = "LINE";

/// One frame of movement intent as carried by `INPUT`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct InputFrame {
    pub forward: f32,
    pub right: f32,
    pub up: f32,
    pub yaw_delta: f32,
    pub pitch_delta: f32,
    pub dt: f32,
}

/// A decoded protocol line. Client and server tags share one namespace.
#[derive(Debug, Clone, PartialEq)]
pub enum Message {
    Hello,
    Input(InputFrame),
    Cmd(String),
    Welcome { version: String },
    State(Pose),
    Hist { count: usize },
    Line(String),
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ProtocolError {
    #[error("empty line")]
    Empty,
    #[error("unknown message tag {0:?}")]
    UnknownTag(String),
    #[error("{tag} expects {expected} fields, got {found}")]
    FieldCount {
        tag: &'static str,
        expected: usize,
        found: usize,
    },
    #[error("{tag}: invalid field {field:?}")]
    InvalidField { tag: &'static str, field: String },
}

impl Message {
    pub fn tag(&self) -> &'static str {
        match self {
            Message::Hello => TAG_HELLO,
            Message::Input(_) => TAG_INPUT,
            Message::Cmd(_) => TAG_CMD,
            Message::Welcome { .. } => TAG_WELCOME,
            Message::State(_) => TAG_STATE,
            Message::Hist { .. } => TAG_HIST,
            Message::Line(_) => TAG_LINE,
        }
    }

    /// Formats the message as a wire line without the trailing newline.
    pub fn encode(&self) -> String {
        let mut out = String::from(self.tag());
        match self {
            Message::Hello => {}
            Message::Input(input) => {
                push_floats(
                    &mut out,
                    &[
                        input.forward,
                        input.right,
                        input.up,
                        input.yaw_delta,
                        input.pitch_delta,
                        input.dt,
                    ],
                );
            }
            Message::Cmd(text) | Message::Line(text) => {
                out.push(' ');
                push_text(&mut out, text);
            }
            Message::Welcome { version } => {
                out.push(' ');
                push_text(&mut out, version.split_whitespace().next().unwrap_or(""));
            }
            Message::State(pose) => {
                push_floats(
                    &mut out,
                    &[
                        pose.position.x,
                        pose.position.y,
                        pose.position.z,
                        pose.yaw,
                        pose.pitch,
                    ],
                );
            }
            Message::Hist { count } => {
                let _ = write!(out, " {count}");
            }
        }
        out
    }

    pub fn decode(line: &str) -> Result<Self, ProtocolError> {
        let (tag, rest) = match line.split_once(' ') {
            Some((tag, rest)) => (tag, rest),
            None => (line, ""),
        };

        match tag {
            "" => Err(ProtocolError::Empty),
            TAG_HELLO => {
                expect_fields(TAG_HELLO, rest, 0)?;
                Ok(Message::Hello)
            }
            TAG_INPUT => {
                let [forward, right, up, yaw_delta, pitch_delta, dt] =
                    parse_fields::<f32, 6>(TAG_INPUT, rest)?;
                Ok(Message::Input(InputFrame {
                    forward,
                    right,
                    up,
                    yaw_delta,
                    pitch_delta,
                    dt,
                }))
            }
            TAG_CMD => Ok(Message::Cmd(rest.to_string())),
            TAG_WELCOME => {
                let fields = expect_fields(TAG_WELCOME, rest, 1)?;
                Ok(Message::Welcome {
                    version: fields[0].to_string(),
                })
            }
            TAG_STATE => {
                let [x, y, z, yaw, pitch] = parse_fields::<f32, 5>(TAG_STATE, rest)?;
                Ok(Message::State(Pose::new(Vec3::new(x, y, z), yaw, pitch)))
            }
            TAG_HIST => {
                let [count] = parse_fields::<usize, 1>(TAG_HIST, rest)?;
                Ok(Message::Hist { count })
            }
            TAG_LINE => Ok(Message::Line(rest.to_string())),
            other => Err(ProtocolError::UnknownTag(other.to_string())),
        }
    }
}

fn push_floats(out: &mut String, values: &[f32]) {
    for value in values {
        let _ = write!(out, " {value:.6}");
    }
}

// Free text must not smuggle delimiters into the stream.
fn push_text(out: &mut String, text: &str) {
    out.extend(text.chars().map(|c| if c == '\n' || c == '\r' { ' ' } else { c }));
}

fn expect_fields<'a>(
    tag: &'static str,
    rest: &'a str,
    expected: usize,
) -> Result<Vec<&'a str>, ProtocolError> {
    let fields: Vec<&str> = rest.split_whitespace().collect();
    if fields.len() != expected {
        return Err(ProtocolError::FieldCount {
            tag,
            expected,
            found: fields.len(),
        });
    }
    Ok(fields)
}

trait WireNumber: FromStr + Copy + Default {
    fn is_valid(&self) -> bool;
}

impl WireNumber for f32 {
    fn is_valid(&self) -> bool {
        self.is_finite()
    }
}

impl WireNumber for usize {
    fn is_valid(&self) -> bool {
        true
    }
}

fn parse_fields<T: WireNumber, const N: usize>(
    tag: &'static str,
    rest: &str,
) -> Result<[T; N], ProtocolError> {
    let fields = expect_fields(tag, rest, N)?;
    let mut values = [T::default(); N];
    for (slot, field) in values.iter_mut().zip(fields) {
        *slot = field
            .parse::<T>()
            .ok()
            .filter(|value| value.is_valid())
            .ok_or_else(|| ProtocolError::InvalidField {
                tag,
                field: field.to_string(),
            })?;
    }
    Ok(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_encoding_fixed_precision() {
        let pose = Pose::new(Vec3::new(0.0, 1.6, 2.45), 0.0, -0.5);
        assert_eq!(
            Message::State(pose).encode(),
            "STATE 0.000000 1.600000 2.450000 0.000000 -0.500000"
        );
    }

    #[test]
    fn test_input_decoding() {
        let message = Message::decode("INPUT 1 0 0 0.0 -0.25 0.1").unwrap();
        assert_eq!(
            message,
            Message::Input(InputFrame {
                forward: 1.0,
                right: 0.0,
                up: 0.0,
                yaw_delta: 0.0,
                pitch_delta: -0.25,
                dt: 0.1,
            })
        );
    }

    #[test]
    fn test_input_wrong_field_count() {
        assert_eq!(
            Message::decode("INPUT 1 0 0"),
            Err(ProtocolError::FieldCount {
                tag: "INPUT",
                expected: 6,
                found: 3
            })
        );
        assert!(matches!(
            Message::decode("INPUT 1 0 0 0 0 0.1 7"),
            Err(ProtocolError::FieldCount { found: 7, .. })
        ));
    }

    #[test]
    fn test_rejects_bad_numbers() {
        assert!(matches!(
            Message::decode("INPUT 1 0 zero 0 0 0.1"),
            Err(ProtocolError::InvalidField { .. })
        ));
        assert!(matches!(
            Message::decode("STATE nan 0 0 0 0"),
            Err(ProtocolError::InvalidField { .. })
        ));
        assert!(matches!(
            Message::decode("HIST -3"),
            Err(ProtocolError::InvalidField { .. })
        ));
    }

    #[test]
    fn test_free_text_is_preserved() {
        assert_eq!(
            Message::decode("LINE >>> ").unwrap(),
            Message::Line(">>> ".to_string())
        );
        assert_eq!(
            Message::decode("CMD x = 2 * (3 + 4)").unwrap(),
            Message::Cmd("x = 2 * (3 + 4)".to_string())
        );
        assert_eq!(Message::decode("CMD").unwrap(), Message::Cmd(String::new()));
    }

    #[test]
    fn test_text_cannot_break_framing() {
        let encoded = Message::Line("two\nlines\r".to_string()).encode();
        assert_eq!(encoded, "LINE two lines ");
    }

    #[test]
    fn test_handshake_messages() {
        assert_eq!(Message::decode("HELLO").unwrap(), Message::Hello);
        assert_eq!(
            Message::decode("WELCOME 0.1").unwrap(),
            Message::Welcome {
                version: "0.1".to_string()
            }
        );
        assert_eq!(
            Message::decode("HIST 3").unwrap(),
            Message::Hist { count: 3 }
        );
        assert_eq!(Message::Hist { count: 3 }.encode(), "HIST 3");
        assert_eq!(
            Message::decode("PROMPT"),
            Err(ProtocolError::UnknownTag("PROMPT".to_string()))
        );
        assert_eq!(Message::decode(""), Err(ProtocolError::Empty));
    }
}
