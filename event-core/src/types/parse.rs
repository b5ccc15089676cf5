use std::any::type_name;

use crate::error::TypeResolutionError;
use crate::types::{ErasedType, TypeArg, TypeToken, Wildcard};

const ANONYMOUS_MARKERS: [&str; 3] = ["{{closure}}", "{{opaque}}", "{{constant}}"];

const LEAF_PREFIXES: [&str; 8] = ["fn(", "unsafe ", "extern ", "for<", "dyn ", "&", "*const ", "*mut "];

/// Turns a `type_name` into a token. Only the outermost `Base<..>` of each
/// segment is split; tuples, arrays, references, raw pointers, trait objects
/// and function pointers are kept whole as leaf tokens.
pub(crate) fn resolve(name: &'static str) -> Result<TypeToken, TypeResolutionError> {
    if ANONYMOUS_MARKERS.iter().any(|marker| name.contains(marker)) {
        return Err(TypeResolutionError::Anonymous(name.to_string()));
    }
    parse_token(name, name)
}

fn parse_token(name: &'static str, segment: &'static str) -> Result<TypeToken, TypeResolutionError> {
    let segment = segment.trim();
    if segment.is_empty() {
        return Err(malformed(name));
    }
    let span = generic_span(segment).ok_or_else(|| malformed(name))?;
    if LEAF_PREFIXES.iter().any(|prefix| segment.starts_with(prefix)) {
        return Ok(TypeToken::raw(ErasedType(segment)));
    }
    match span {
        None => Ok(TypeToken::raw(ErasedType(segment))),
        Some((open, close)) => {
            let base = segment[..open].trim_end();
            let args = split_args(&segment[open + 1..close])
                .ok_or_else(|| malformed(name))?
                .into_iter()
                .map(|arg| parse_arg(name, arg))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(TypeToken::parameterized(ErasedType(base), args))
        }
    }
}

fn parse_arg(name: &'static str, arg: &'static str) -> Result<TypeArg, TypeResolutionError> {
    let arg = arg.trim();
    if arg == type_name::<Wildcard>() {
        Ok(TypeArg::Wildcard)
    } else {
        parse_token(name, arg).map(TypeArg::Type)
    }
}

/// Byte offsets of the top level `<` and its matching `>`, `Some(None)` when
/// the segment is atomic, `None` when the brackets do not balance.
fn generic_span(segment: &str) -> Option<Option<(usize, usize)>> {
    let bytes = segment.as_bytes();
    let mut nesting = 0usize;
    let mut angle = 0usize;
    let mut open = None;
    let mut close = None;
    for (index, byte) in bytes.iter().enumerate() {
        match byte {
            b'(' | b'[' => nesting += 1,
            b')' | b']' => nesting = nesting.checked_sub(1)?,
            b'<' if nesting == 0 => {
                if open.is_none() {
                    open = Some(index);
                }
                angle += 1;
            }
            b'>' if nesting == 0 && !is_arrow(bytes, index) => {
                angle = angle.checked_sub(1)?;
                if angle == 0 && close.is_none() {
                    close = Some(index);
                }
            }
            _ => {}
        }
    }
    if nesting != 0 || angle != 0 {
        return None;
    }
    match (open, close) {
        (Some(open), Some(close)) if open > 0 && segment[close + 1..].trim().is_empty() => Some(Some((open, close))),
        _ => Some(None),
    }
}

fn split_args(inner: &'static str) -> Option<Vec<&'static str>> {
    let bytes = inner.as_bytes();
    let mut depth = 0usize;
    let mut start = 0;
    let mut args = vec![];
    for (index, byte) in bytes.iter().enumerate() {
        match byte {
            b'<' | b'(' | b'[' => depth += 1,
            b'>' if is_arrow(bytes, index) => {}
            b'>' | b')' | b']' => depth = depth.checked_sub(1)?,
            b',' if depth == 0 => {
                args.push(&inner[start..index]);
                start = index + 1;
            }
            _ => {}
        }
    }
    args.push(&inner[start..]);
    if depth != 0 || args.iter().any(|arg| arg.trim().is_empty()) {
        return None;
    }
    Some(args)
}

fn is_arrow(bytes: &[u8], index: usize) -> bool {
    index > 0 && bytes[index - 1] == b'-'
}

fn malformed(name: &str) -> TypeResolutionError {
    TypeResolutionError::Malformed(name.to_string())
}
