//! PEM framing for certificate files.
//!
//! Input files may hold any number of concatenated blocks with free text
//! between them. Block bodies are decoded leniently (any line width, trailing
//! whitespace tolerated), but blocks carrying encapsulated headers such as
//! `Proc-Type:` are rejected. A malformed block never hides the blocks after
//! it.

use ::pem::{EncodeConfig, LineEnding, Pem};

use crate::domain::certificate::ParsedCertificate;
use crate::infra::error::{ChainError, ChainResult};

/// Label of certificate blocks.
pub const CERTIFICATE_LABEL: &str = "CERTIFICATE";

const BEGIN_MARKER: &[u8] = b"-----BEGIN ";
const END_MARKER: &[u8] = b"-----END ";
const BOUNDARY_TAIL: &[u8] = b"-----";

/// A decoded PEM block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PemBlock {
    pub label: String,
    pub contents: Vec<u8>,
}

/// Split `input` into framed PEM blocks, from `-----BEGIN <label>-----`
/// through the matching `-----END <label>-----`.
///
/// A BEGIN line without a matching END, or one followed by another BEGIN
/// before its END, is skipped and scanning resumes after it.
#[must_use]
pub fn pem_blocks(input: &[u8]) -> Vec<&[u8]> {
    let mut blocks = Vec::new();
    let mut pos = 0;

    while let Some(start) = find(&input[pos..], BEGIN_MARKER).map(|i| i + pos) {
        let label_start = start + BEGIN_MARKER.len();
        let Some(label_end) = find(&input[label_start..], BOUNDARY_TAIL).map(|i| i + label_start)
        else {
            break;
        };
        let label = &input[label_start..label_end];
        let body_start = label_end + BOUNDARY_TAIL.len();

        if label.contains(&b'\n') {
            pos = label_start;
            continue;
        }

        let mut end_line = Vec::with_capacity(END_MARKER.len() + label.len() + BOUNDARY_TAIL.len());
        end_line.extend_from_slice(END_MARKER);
        end_line.extend_from_slice(label);
        end_line.extend_from_slice(BOUNDARY_TAIL);

        let end = find(&input[body_start..], &end_line).map(|i| i + body_start);
        let next_begin = find(&input[body_start..], BEGIN_MARKER).map(|i| i + body_start);

        match (end, next_begin) {
            (None, _) => {
                log::debug!(
                    "no END line for {} block, skipping",
                    String::from_utf8_lossy(label)
                );
                pos = body_start;
            }
            (Some(end), Some(next)) if next < end => {
                log::debug!(
                    "truncated {} block, skipping",
                    String::from_utf8_lossy(label)
                );
                pos = next;
            }
            (Some(end), _) => {
                let block_end = end + end_line.len();
                blocks.push(&input[start..block_end]);
                pos = block_end;
            }
        }
    }

    blocks
}

/// Decode one framed block.
pub fn decode_block(block: &[u8]) -> ChainResult<PemBlock> {
    let parsed = ::pem::parse(block)?;
    if parsed.headers().iter().next().is_some() {
        return Err(ChainError::PemError(format!(
            "{} block carries encapsulated headers",
            parsed.tag()
        )));
    }

    Ok(PemBlock {
        label: parsed.tag().to_string(),
        contents: parsed.into_contents(),
    })
}

/// Decode every `CERTIFICATE` block in `input`.
///
/// Blocks with another label are dropped; each remaining entry is either a
/// parsed certificate or the reason it was rejected.
#[must_use]
pub fn decode_certificates(input: &[u8]) -> Vec<ChainResult<ParsedCertificate>> {
    pem_blocks(input)
        .into_iter()
        .filter_map(|framed| match decode_block(framed) {
            Ok(block) if block.label == CERTIFICATE_LABEL => {
                Some(ParsedCertificate::from_der(&block.contents))
            }
            Ok(block) => {
                log::debug!("skipping PEM block labelled {}", block.label);
                None
            }
            Err(e) => Some(Err(e)),
        })
        .collect()
}

/// Read the certificate a chain is built for.
///
/// The first PEM block must be a certificate. A buffer without any PEM
/// framing is treated as raw DER.
pub fn read_leaf(input: &[u8]) -> ChainResult<ParsedCertificate> {
    let Some(first) = pem_blocks(input).into_iter().next() else {
        log::debug!("no PEM framing found, trying DER");
        return ParsedCertificate::from_der(input);
    };

    let block = decode_block(first)?;
    if block.label != CERTIFICATE_LABEL {
        return Err(ChainError::InvalidInput(format!(
            "expected a {CERTIFICATE_LABEL} PEM block, found {}",
            block.label
        )));
    }

    ParsedCertificate::from_der(&block.contents)
}

/// Encode a certificate as a `CERTIFICATE` PEM block, 64 columns wide with
/// LF line endings.
#[must_use]
pub fn encode_certificate(cert: &ParsedCertificate) -> String {
    let block = Pem::new(CERTIFICATE_LABEL, cert.raw().to_vec());
    ::pem::encode_config(&block, EncodeConfig::new().set_line_ending(LineEnding::LF))
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}
