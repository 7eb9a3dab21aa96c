//! `StreamAccumulator`: merges partial model deltas into final `Part`s by
//! index (spec §4.6).

use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::AgentError;
use crate::item::ModelResponse;
use crate::part::{AudioFormat, Citation, Cost, Part, Usage};

/// One incremental update from the LM transport. Forwarded verbatim to
/// the caller as `AgentStreamEvent::Partial` (spec §4.5).
#[derive(Clone, Debug)]
pub struct ModelPartial {
    /// A delta for one content part, keyed by the transport-assigned
    /// index. `None` when this partial carries only usage/cost.
    pub part: Option<IndexedPartDelta>,
    pub usage: Option<Usage>,
    pub cost: Option<Cost>,
}

#[derive(Clone, Debug)]
pub struct IndexedPartDelta {
    pub index: usize,
    pub delta: PartDelta,
}

/// A delta for one part. The first delta for an index establishes the
/// part's kind; subsequent deltas for the same index must carry the
/// same variant (spec §4.6).
#[derive(Clone, Debug)]
pub enum PartDelta {
    Text {
        text: String,
        citation: Option<Citation>,
    },
    ToolCall {
        tool_name: Option<String>,
        tool_call_id: Option<String>,
        args: Option<String>,
        id: Option<String>,
    },
    Image {
        data: Vec<u8>,
        mime_type: Option<String>,
        width: Option<u32>,
        height: Option<u32>,
        id: Option<String>,
    },
    Audio {
        data: Vec<u8>,
        mime_type: Option<String>,
        sample_rate: Option<u32>,
        channels: Option<u32>,
        format: Option<AudioFormat>,
        transcript_delta: Option<String>,
        id: Option<String>,
    },
    Reasoning {
        text: String,
        signature: Option<String>,
        id: Option<String>,
    },
    Source {
        text: String,
        source: Option<String>,
        id: Option<String>,
    },
}

/// Per-part accumulator state, one per transport index.
enum PartAcc {
    Text {
        text: String,
        citations: Vec<Citation>,
    },
    ToolCall {
        tool_name: Option<String>,
        tool_call_id: Option<String>,
        args: String,
        id: Option<String>,
    },
    Image {
        data: Vec<u8>,
        mime_type: Option<String>,
        width: Option<u32>,
        height: Option<u32>,
        id: Option<String>,
    },
    Audio {
        data: Vec<u8>,
        mime_type: Option<String>,
        sample_rate: Option<u32>,
        channels: Option<u32>,
        format: Option<AudioFormat>,
        transcript: String,
        id: Option<String>,
        chunk_count: usize,
    },
    Reasoning {
        text: String,
        signature: Option<String>,
        id: Option<String>,
    },
    Source {
        text: String,
        source: Option<String>,
        id: Option<String>,
    },
}

/// Maintains a mapping from transport `index` to a per-part accumulator,
/// plus additively-accumulated usage/cost (spec §4.6).
#[derive(Default)]
pub struct StreamAccumulator {
    parts: BTreeMap<usize, PartAcc>,
    usage: Option<Usage>,
    cost: Option<Cost>,
}

impl ModelPartial {
    /// Wraps an already-complete `Part` as a single one-shot partial at
    /// `index`, for `LanguageModel` implementations with no native
    /// incremental streaming (spec §4.5: the accumulator must still
    /// merge cleanly even from a single full delta per part).
    pub fn from_complete_part(index: usize, part: Part) -> Self {
        let delta = match part {
            Part::Text(p) => PartDelta::Text {
                text: p.text,
                citation: p.citations.into_iter().next(),
            },
            Part::ToolCall(p) => PartDelta::ToolCall {
                tool_name: Some(p.tool_name),
                tool_call_id: Some(p.tool_call_id),
                args: Some(p.args.to_string()),
                id: p.id,
            },
            Part::Image(p) => PartDelta::Image {
                data: p.data,
                mime_type: p.mime_type,
                width: p.width,
                height: p.height,
                id: p.id,
            },
            Part::Audio(p) => PartDelta::Audio {
                data: p.data,
                mime_type: p.mime_type,
                sample_rate: p.sample_rate,
                channels: p.channels,
                format: p.format,
                transcript_delta: p.transcript,
                id: p.id,
            },
            Part::Reasoning(p) => PartDelta::Reasoning {
                text: p.text,
                signature: p.signature,
                id: p.id,
            },
            Part::Source(p) => PartDelta::Source {
                text: p.text,
                source: p.source,
                id: p.id,
            },
        };
        ModelPartial {
            part: Some(IndexedPartDelta { index, delta }),
            usage: None,
            cost: None,
        }
    }
}

impl StreamAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_partial(&mut self, partial: ModelPartial) -> Result<(), AgentError> {
        if let Some(u) = partial.usage {
            self.usage = Some(match self.usage.take() {
                Some(existing) => existing + u,
                None => u,
            });
        }
        if let Some(c) = partial.cost {
            self.cost = Some(match self.cost.take() {
                Some(existing) => existing + c,
                None => c,
            });
        }
        if let Some(IndexedPartDelta { index, delta }) = partial.part {
            self.merge(index, delta)?;
        }
        Ok(())
    }

    fn merge(&mut self, index: usize, delta: PartDelta) -> Result<(), AgentError> {
        match self.parts.entry(index).or_insert_with(|| PartAcc::new(&delta)) {
            PartAcc::Text { text, citations } => match delta {
                PartDelta::Text { text: t, citation } => {
                    text.push_str(&t);
                    if let Some(c) = citation {
                        citations.push(c);
                    }
                    Ok(())
                }
                _ => Err(kind_mismatch(index)),
            },
            PartAcc::ToolCall {
                tool_name,
                tool_call_id,
                args,
                id,
            } => match delta {
                PartDelta::ToolCall {
                    tool_name: tn,
                    tool_call_id: tcid,
                    args: a,
                    id: did,
                } => {
                    if let Some(tn) = tn {
                        tool_name.get_or_insert_with(String::new).push_str(&tn);
                    }
                    if let Some(a) = a {
                        args.push_str(&a);
                    }
                    if let Some(tcid) = tcid {
                        *tool_call_id = Some(tcid);
                    }
                    if let Some(did) = did {
                        *id = Some(did);
                    }
                    Ok(())
                }
                _ => Err(kind_mismatch(index)),
            },
            PartAcc::Image {
                data,
                mime_type,
                width,
                height,
                id,
            } => match delta {
                PartDelta::Image {
                    data: d,
                    mime_type: mt,
                    width: w,
                    height: h,
                    id: did,
                } => {
                    data.extend_from_slice(&d);
                    if mt.is_some() {
                        *mime_type = mt;
                    }
                    if w.is_some() {
                        *width = w;
                    }
                    if h.is_some() {
                        *height = h;
                    }
                    if did.is_some() {
                        *id = did;
                    }
                    Ok(())
                }
                _ => Err(kind_mismatch(index)),
            },
            PartAcc::Audio {
                data,
                mime_type,
                sample_rate,
                channels,
                format,
                transcript,
                id,
                chunk_count,
            } => match delta {
                PartDelta::Audio {
                    data: d,
                    mime_type: mt,
                    sample_rate: sr,
                    channels: ch,
                    format: fmt,
                    transcript_delta,
                    id: did,
                } => {
                    *chunk_count += 1;
                    let is_linear16 = matches!(
                        format.as_ref().or(fmt.as_ref()),
                        None | Some(AudioFormat::Linear16)
                    );
                    if !d.is_empty() {
                        if !is_linear16 && *chunk_count > 1 {
                            return Err(AgentError::invariant(format!(
                                "audio part {index}: concatenation not implemented for non-linear16 format"
                            )));
                        }
                        data.extend_from_slice(&d);
                    }
                    if let Some(t) = transcript_delta {
                        transcript.push_str(&t);
                    }
                    if mt.is_some() {
                        *mime_type = mt;
                    }
                    if sr.is_some() {
                        *sample_rate = sr;
                    }
                    if ch.is_some() {
                        *channels = ch;
                    }
                    if fmt.is_some() {
                        *format = fmt;
                    }
                    if did.is_some() {
                        *id = did;
                    }
                    Ok(())
                }
                _ => Err(kind_mismatch(index)),
            },
            PartAcc::Reasoning {
                text,
                signature,
                id,
            } => match delta {
                PartDelta::Reasoning {
                    text: t,
                    signature: sig,
                    id: did,
                } => {
                    text.push_str(&t);
                    if sig.is_some() {
                        *signature = sig;
                    }
                    if did.is_some() {
                        *id = did;
                    }
                    Ok(())
                }
                _ => Err(kind_mismatch(index)),
            },
            PartAcc::Source { text, source, id } => match delta {
                PartDelta::Source {
                    text: t,
                    source: src,
                    id: did,
                } => {
                    text.push_str(&t);
                    if src.is_some() {
                        *source = src;
                    }
                    if did.is_some() {
                        *id = did;
                    }
                    Ok(())
                }
                _ => Err(kind_mismatch(index)),
            },
        }
    }

    /// Finalizes accumulated deltas into an ordered `ModelResponse`.
    pub fn compute_response(self) -> Result<ModelResponse, AgentError> {
        let mut content = Vec::with_capacity(self.parts.len());
        for (index, acc) in self.parts {
            content.push(acc.finalize(index)?);
        }
        Ok(ModelResponse {
            content,
            usage: self.usage,
            cost: self.cost,
        })
    }
}

impl PartAcc {
    fn new(delta: &PartDelta) -> Self {
        match delta {
            PartDelta::Text { .. } => PartAcc::Text {
                text: String::new(),
                citations: Vec::new(),
            },
            PartDelta::ToolCall { .. } => PartAcc::ToolCall {
                tool_name: None,
                tool_call_id: None,
                args: String::new(),
                id: None,
            },
            PartDelta::Image { .. } => PartAcc::Image {
                data: Vec::new(),
                mime_type: None,
                width: None,
                height: None,
                id: None,
            },
            PartDelta::Audio { .. } => PartAcc::Audio {
                data: Vec::new(),
                mime_type: None,
                sample_rate: None,
                channels: None,
                format: None,
                transcript: String::new(),
                id: None,
                chunk_count: 0,
            },
            PartDelta::Reasoning { .. } => PartAcc::Reasoning {
                text: String::new(),
                signature: None,
                id: None,
            },
            PartDelta::Source { .. } => PartAcc::Source {
                text: String::new(),
                source: None,
                id: None,
            },
        }
    }

    fn finalize(self, index: usize) -> Result<Part, AgentError> {
        match self {
            PartAcc::Text { text, citations } => {
                Ok(Part::Text(crate::part::TextPart { text, citations }))
            }
            PartAcc::ToolCall {
                tool_name,
                tool_call_id,
                args,
                id,
            } => {
                let tool_call_id = tool_call_id.ok_or_else(|| {
                    AgentError::invariant(format!(
                        "tool call part {index}: missing tool_call_id after stream completion"
                    ))
                })?;
                let tool_name = tool_name.ok_or_else(|| {
                    AgentError::invariant(format!(
                        "tool call part {index}: missing tool_name after stream completion"
                    ))
                })?;
                let args_value: Value = if args.trim().is_empty() {
                    Value::Object(Default::default())
                } else {
                    let parsed: Value = serde_json::from_str(&args).map_err(|e| {
                        AgentError::invariant(format!(
                            "tool call part {index}: args did not parse as JSON: {e}"
                        ))
                    })?;
                    if !parsed.is_object() {
                        return Err(AgentError::invariant(format!(
                            "tool call part {index}: args must parse as a JSON object"
                        )));
                    }
                    parsed
                };
                Ok(Part::ToolCall(crate::part::ToolCallPart {
                    tool_call_id,
                    tool_name,
                    args: args_value,
                    id,
                }))
            }
            PartAcc::Image {
                data,
                mime_type,
                width,
                height,
                id,
            } => Ok(Part::Image(crate::part::ImagePart {
                data,
                mime_type,
                width,
                height,
                id,
            })),
            PartAcc::Audio {
                data,
                mime_type,
                sample_rate,
                channels,
                format,
                transcript,
                id,
                ..
            } => Ok(Part::Audio(crate::part::AudioPart {
                data,
                mime_type,
                sample_rate,
                channels,
                format,
                transcript: if transcript.is_empty() {
                    None
                } else {
                    Some(transcript)
                },
                id,
            })),
            PartAcc::Reasoning {
                text,
                signature,
                id,
            } => Ok(Part::Reasoning(crate::part::ReasoningPart {
                text,
                signature,
                id,
            })),
            PartAcc::Source { text, source, id } => {
                Ok(Part::Source(crate::part::SourcePart { text, source, id }))
            }
        }
    }
}

fn kind_mismatch(index: usize) -> AgentError {
    AgentError::invariant(format!(
        "stream part {index}: delta kind did not match the part's established kind"
    ))
}
