//! Content signatures (magic bytes).
//!
//! A [`Signature`] holds a priority and a tree of [`MagicRule`]s. Sibling
//! rules are alternatives; a rule with children matches only when one of its
//! children matches too. Every value type the descriptor format knows
//! (`string`, `byte`, the 16- and 32-bit integers) is lowered to a plain byte
//! sequence at load time, so matching is a masked byte comparison.

use std::io::{self, Read};
use std::str::FromStr;

use crate::one_or_many::OneOrMany;

/// Priority given to signatures that do not declare one.
pub const DEFAULT_PRIORITY: u32 = 50;

/// Largest start offset a descriptor rule may name. Bounds how far into a
/// stream sniffing reads.
pub const MAX_MAGIC_OFFSET: usize = 64 * 1024;

/// The value encodings a rule may be declared with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    String,
    Byte,
    Big16,
    Little16,
    Host16,
    Big32,
    Little32,
    Host32,
}

impl FromStr for ValueType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            "string" => ValueType::String,
            "byte" => ValueType::Byte,
            "big16" => ValueType::Big16,
            "little16" => ValueType::Little16,
            "host16" => ValueType::Host16,
            "big32" => ValueType::Big32,
            "little32" => ValueType::Little32,
            "host32" => ValueType::Host32,
            other => return Err(format!("unknown magic value type {other:?}")),
        })
    }
}

impl ValueType {
    /// Encode `text` as the bytes this type compares against.
    pub fn lower_value(self, text: &str) -> Result<Vec<u8>, String> {
        match self {
            ValueType::String => unescape(text),
            _ => self.lower_number(text),
        }
    }

    /// Encode a mask. String masks are hex (`0xff00ff`); numeric masks use
    /// the value encoding.
    pub fn lower_mask(self, text: &str) -> Result<Vec<u8>, String> {
        match self {
            ValueType::String => parse_hex_bytes(text),
            _ => self.lower_number(text),
        }
    }

    fn lower_number(self, text: &str) -> Result<Vec<u8>, String> {
        let n = parse_number(text)?;
        let narrow = |max: u64| {
            if n > max {
                Err(format!("value {text:?} does not fit {self:?}"))
            } else {
                Ok(n)
            }
        };
        Ok(match self {
            ValueType::String => return Err("string values are not numeric".to_string()),
            ValueType::Byte => vec![narrow(u8::MAX as u64)? as u8],
            ValueType::Big16 => (narrow(u16::MAX as u64)? as u16).to_be_bytes().to_vec(),
            ValueType::Little16 => (narrow(u16::MAX as u64)? as u16).to_le_bytes().to_vec(),
            ValueType::Host16 => (narrow(u16::MAX as u64)? as u16).to_ne_bytes().to_vec(),
            ValueType::Big32 => (narrow(u32::MAX as u64)? as u32).to_be_bytes().to_vec(),
            ValueType::Little32 => (narrow(u32::MAX as u64)? as u32).to_le_bytes().to_vec(),
            ValueType::Host32 => (narrow(u32::MAX as u64)? as u32).to_ne_bytes().to_vec(),
        })
    }
}

/// One byte comparison at an offset or range of offsets.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MagicRule {
    value: Vec<u8>,
    mask: Option<Vec<u8>>,
    start: usize,
    end: usize,
    children: Vec<MagicRule>,
}

impl MagicRule {
    /// Compare `value` at exactly `offset`.
    pub fn new(value: impl Into<Vec<u8>>, offset: usize) -> Self {
        Self {
            value: value.into(),
            mask: None,
            start: offset,
            end: offset,
            children: Vec::new(),
        }
    }

    /// Build from descriptor attributes: `type`, `value`, `offset` (`n` or
    /// `start:end`), and an optional `mask`.
    pub fn parse(kind: &str, value: &str, offset: &str, mask: Option<&str>) -> Result<Self, String> {
        let kind: ValueType = kind.parse()?;
        let bytes = kind.lower_value(value)?;
        if bytes.is_empty() {
            return Err("empty magic value".to_string());
        }
        let (start, end) = parse_offset(offset)?;
        let mut rule = MagicRule::new(bytes, start).with_range_end(end)?;
        if let Some(mask) = mask {
            rule = rule.with_mask(kind.lower_mask(mask)?)?;
        }
        Ok(rule)
    }

    /// Try every start offset up to and including `end`.
    pub fn with_range_end(mut self, end: usize) -> Result<Self, String> {
        if end < self.start {
            return Err(format!("offset range {}:{end} is reversed", self.start));
        }
        if end > MAX_MAGIC_OFFSET {
            return Err(format!("offset {end} exceeds {MAX_MAGIC_OFFSET}"));
        }
        self.end = end;
        Ok(self)
    }

    /// Only bits set in `mask` take part in the comparison.
    pub fn with_mask(mut self, mask: Vec<u8>) -> Result<Self, String> {
        if mask.len() != self.value.len() {
            return Err(format!(
                "mask is {} bytes but value is {}",
                mask.len(),
                self.value.len()
            ));
        }
        self.mask = Some(mask);
        Ok(self)
    }

    pub fn with_child(mut self, child: MagicRule) -> Self {
        self.children.push(child);
        self
    }

    pub fn push_child(&mut self, child: MagicRule) {
        self.children.push(child);
    }

    pub fn value(&self) -> &[u8] {
        &self.value
    }

    pub fn mask(&self) -> Option<&[u8]> {
        self.mask.as_deref()
    }

    pub fn offset(&self) -> (usize, usize) {
        (self.start, self.end)
    }

    pub fn children(&self) -> &[MagicRule] {
        &self.children
    }

    /// Bytes of input needed to evaluate this rule and its children.
    pub fn required_len(&self) -> usize {
        let own = self.end.saturating_add(self.value.len());
        self.children
            .iter()
            .map(MagicRule::required_len)
            .fold(own, usize::max)
    }

    pub fn matches_bytes(&self, buf: &[u8]) -> bool {
        let own = (self.start..=self.end).any(|at| self.matches_at(buf, at));
        own && (self.children.is_empty() || self.children.iter().any(|c| c.matches_bytes(buf)))
    }

    fn matches_at(&self, buf: &[u8], at: usize) -> bool {
        let Some(window) = at
            .checked_add(self.value.len())
            .and_then(|stop| buf.get(at..stop))
        else {
            return false;
        };
        match &self.mask {
            None => window == self.value.as_slice(),
            Some(mask) => window
                .iter()
                .zip(&self.value)
                .zip(mask)
                .all(|((b, v), m)| b & m == v & m),
        }
    }
}

/// A prioritized set of alternative rules identifying one media type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Signature {
    priority: u32,
    rules: Vec<MagicRule>,
}

impl Signature {
    pub fn new(priority: u32) -> Self {
        Self {
            priority,
            rules: Vec::new(),
        }
    }

    pub fn with_rule(mut self, rule: MagicRule) -> Self {
        self.rules.push(rule);
        self
    }

    pub fn push_rule(&mut self, rule: MagicRule) {
        self.rules.push(rule);
    }

    pub fn priority(&self) -> u32 {
        self.priority
    }

    pub fn rules(&self) -> &[MagicRule] {
        &self.rules
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Leading bytes needed to evaluate every rule.
    pub fn required_len(&self) -> usize {
        self.rules
            .iter()
            .map(MagicRule::required_len)
            .max()
            .unwrap_or(0)
    }

    pub fn matches_bytes(&self, buf: &[u8]) -> bool {
        self.rules.iter().any(|r| r.matches_bytes(buf))
    }

    /// Read at most [`Signature::required_len`] bytes from `reader` and test
    /// them.
    pub fn matches<R: Read>(&self, reader: R) -> io::Result<bool> {
        let head = read_head(reader, self.required_len())?;
        Ok(self.matches_bytes(&head))
    }
}

impl OneOrMany<Signature> {
    /// `true` if any signature matches.
    pub fn matches_bytes(&self, buf: &[u8]) -> bool {
        self.iter().any(|s| s.matches_bytes(buf))
    }

    pub fn required_len(&self) -> usize {
        self.iter().map(Signature::required_len).max().unwrap_or(0)
    }

    /// Read enough of `reader` for the longest signature and test it.
    pub fn matches<R: Read>(&self, reader: R) -> io::Result<bool> {
        let head = read_head(reader, self.required_len())?;
        Ok(self.matches_bytes(&head))
    }
}

/// Read up to `limit` leading bytes.
pub fn read_head<R: Read>(reader: R, limit: usize) -> io::Result<Vec<u8>> {
    let mut head = Vec::with_capacity(limit.min(64 * 1024));
    reader.take(limit as u64).read_to_end(&mut head)?;
    Ok(head)
}

fn parse_offset(text: &str) -> Result<(usize, usize), String> {
    let parse = |s: &str| {
        let at = s
            .trim()
            .parse::<usize>()
            .map_err(|_| format!("invalid magic offset {text:?}"))?;
        if at > MAX_MAGIC_OFFSET {
            return Err(format!("magic offset {text:?} exceeds {MAX_MAGIC_OFFSET}"));
        }
        Ok(at)
    };
    match text.split_once(':') {
        Some((start, end)) => Ok((parse(start)?, parse(end)?)),
        None => {
            let at = parse(text)?;
            Ok((at, at))
        }
    }
}

/// C-style integer: `0x` hex, leading-`0` octal, otherwise decimal.
fn parse_number(text: &str) -> Result<u64, String> {
    let t = text.trim();
    let parsed = if let Some(hex) = t.strip_prefix("0x").or_else(|| t.strip_prefix("0X")) {
        u64::from_str_radix(hex, 16)
    } else if t.len() > 1 && t.starts_with('0') {
        u64::from_str_radix(&t[1..], 8)
    } else {
        t.parse::<u64>()
    };
    parsed.map_err(|_| format!("invalid magic number {text:?}"))
}

fn parse_hex_bytes(text: &str) -> Result<Vec<u8>, String> {
    let hex = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .unwrap_or(text);
    if hex.is_empty() || hex.len() % 2 != 0 || !hex.is_ascii() {
        return Err(format!("invalid hex mask {text:?}"));
    }
    (0..hex.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&hex[i..i + 2], 16).map_err(|_| format!("invalid hex mask {text:?}")))
        .collect()
}

/// Decode the escapes allowed in string values: `\n`, `\r`, `\t`, `\\`,
/// `\xHH`, and up to three octal digits.
fn unescape(text: &str) -> Result<Vec<u8>, String> {
    let bytes = text.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        i += 1;
        if b != b'\\' {
            out.push(b);
            continue;
        }
        let Some(&next) = bytes.get(i) else {
            out.push(b'\\');
            break;
        };
        i += 1;
        match next {
            b'n' => out.push(b'\n'),
            b'r' => out.push(b'\r'),
            b't' => out.push(b'\t'),
            b'x' => {
                let digits: Vec<u8> = bytes[i..]
                    .iter()
                    .take(2)
                    .take_while(|c| c.is_ascii_hexdigit())
                    .copied()
                    .collect();
                if digits.is_empty() {
                    return Err(format!("`\\x` without hex digits in {text:?}"));
                }
                i += digits.len();
                let s = std::str::from_utf8(&digits).map_err(|e| e.to_string())?;
                out.push(u8::from_str_radix(s, 16).map_err(|e| e.to_string())?);
            }
            b'0'..=b'7' => {
                let mut n = u32::from(next - b'0');
                let mut taken = 1;
                while taken < 3 {
                    match bytes.get(i) {
                        Some(&d @ b'0'..=b'7') => {
                            n = n * 8 + u32::from(d - b'0');
                            i += 1;
                            taken += 1;
                        }
                        _ => break,
                    }
                }
                let byte = u8::try_from(n).map_err(|_| format!("octal escape out of range in {text:?}"))?;
                out.push(byte);
            }
            other => out.push(other),
        }
    }
    Ok(out)
}
