//! Reader for R's XDR serialization stream (the body of `save()` output).

use super::buffer::XdrBuffer;
use super::decompress::decompress;
use super::error::{RDataError, Result};
use super::object::{Attributes, RObject, RValue};
use tracing::trace;

// SEXP types
const NILSXP: u8 = 0;
const SYMSXP: u8 = 1;
const LISTSXP: u8 = 2;
const CLOSXP: u8 = 3;
const ENVSXP: u8 = 4;
const PROMSXP: u8 = 5;
const LANGSXP: u8 = 6;
const SPECIALSXP: u8 = 7;
const BUILTINSXP: u8 = 8;
const CHARSXP: u8 = 9;
const LGLSXP: u8 = 10;
const INTSXP: u8 = 13;
const REALSXP: u8 = 14;
const CPLXSXP: u8 = 15;
const STRSXP: u8 = 16;
const DOTSXP: u8 = 17;
const VECSXP: u8 = 19;
const EXPRSXP: u8 = 20;
const BCODESXP: u8 = 21;
const EXTPTRSXP: u8 = 22;
const WEAKREFSXP: u8 = 23;
const RAWSXP: u8 = 24;
const S4SXP: u8 = 25;

// serialization pseudo-types
const ALTREP_SXP: u8 = 238;
const ATTRLISTSXP: u8 = 239;
const ATTRLANGSXP: u8 = 240;
const BASEENV_SXP: u8 = 241;
const EMPTYENV_SXP: u8 = 242;
const BCREPREF: u8 = 243;
const BCREPDEF: u8 = 244;
const GENERICREFSXP: u8 = 245;
const CLASSREFSXP: u8 = 246;
const PERSISTSXP: u8 = 247;
const PACKAGESXP: u8 = 248;
const NAMESPACESXP: u8 = 249;
const BASENAMESPACE_SXP: u8 = 250;
const MISSINGARG_SXP: u8 = 251;
const UNBOUNDVALUE_SXP: u8 = 252;
const GLOBALENV_SXP: u8 = 253;
const NILVALUE_SXP: u8 = 254;
const REFSXP: u8 = 255;

const NA_INTEGER: i32 = i32::MIN;
const LATIN1_MASK: i32 = 1 << 2;

/// Unpacked 32-bit item header.
#[derive(Debug, Clone, Copy)]
struct Flags {
    raw: i32,
    sexp_type: u8,
    levels: i32,
    has_attr: bool,
    has_tag: bool,
}

impl Flags {
    fn unpack(raw: i32) -> Self {
        Self {
            raw,
            sexp_type: (raw & 0xff) as u8,
            levels: raw >> 12,
            has_attr: raw & (1 << 9) != 0,
            has_tag: raw & (1 << 10) != 0,
        }
    }
}

/// Decode a whole `.rda` payload (compressed or not) into its named objects.
pub fn parse_rdata(data: &[u8]) -> Result<Vec<(String, RObject)>> {
    let raw = decompress(data)?;
    if raw.len() < 7 {
        return Err(RDataError::BadMagic(String::from_utf8_lossy(&raw).into_owned()));
    }

    let magic = &raw[..5];
    if magic != b"RDX2\n" && magic != b"RDX3\n" {
        return Err(RDataError::BadMagic(String::from_utf8_lossy(magic).into_owned()));
    }
    let format = &raw[5..7];
    if format != b"X\n" {
        return Err(RDataError::UnsupportedFormat(
            String::from_utf8_lossy(format).trim_end().to_string(),
        ));
    }

    let mut reader = Reader::new(&raw[7..]);
    reader.read_header()?;
    let top = reader.read_item()?;

    match top.value {
        RValue::PairList(items) => Ok(items
            .into_iter()
            .map(|(tag, obj)| (tag.unwrap_or_default(), obj))
            .collect()),
        RValue::Null => Ok(Vec::new()),
        _ => Err(RDataError::Unsupported("top-level object is not a pairlist")),
    }
}

pub struct Reader<'a> {
    buf: XdrBuffer<'a>,
    refs: Vec<RObject>,
}

impl<'a> Reader<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            buf: XdrBuffer::new(data),
            refs: Vec::new(),
        }
    }

    /// Version words following the format line.
    pub fn read_header(&mut self) -> Result<()> {
        let version = self.buf.read_i32()?;
        let _writer_version = self.buf.read_i32()?;
        let _min_reader_version = self.buf.read_i32()?;
        match version {
            2 => {}
            3 => {
                let nelen = self.buf.read_i32()?;
                let encoding = self.buf.read_bytes(nelen.max(0) as usize)?;
                trace!(encoding = %String::from_utf8_lossy(encoding), "native encoding");
            }
            v => return Err(RDataError::UnsupportedVersion(v)),
        }
        Ok(())
    }

    pub fn read_item(&mut self) -> Result<RObject> {
        let flags = Flags::unpack(self.buf.read_i32()?);
        self.read_item_with(flags)
    }

    fn read_item_with(&mut self, flags: Flags) -> Result<RObject> {
        match flags.sexp_type {
            NILVALUE_SXP | NILSXP | UNBOUNDVALUE_SXP | MISSINGARG_SXP => Ok(RObject::null()),
            EMPTYENV_SXP | BASEENV_SXP | GLOBALENV_SXP | BASENAMESPACE_SXP => {
                Ok(RObject::new(RValue::Environment))
            }
            REFSXP => {
                let packed = (flags.raw >> 8) as usize;
                let index = if packed == 0 {
                    self.buf.read_i32()? as usize
                } else {
                    packed
                };
                index
                    .checked_sub(1)
                    .and_then(|i| self.refs.get(i))
                    .cloned()
                    .ok_or(RDataError::BadReference(index, self.refs.len()))
            }
            PERSISTSXP => {
                let names = self.read_string_vec()?;
                let obj = RObject::new(RValue::Character(names));
                self.refs.push(obj.clone());
                Ok(obj)
            }
            PACKAGESXP | NAMESPACESXP => {
                self.read_string_vec()?;
                let obj = RObject::new(RValue::Environment);
                self.refs.push(obj.clone());
                Ok(obj)
            }
            SYMSXP => {
                let name = self.read_item()?;
                let name = name.as_scalar_string().unwrap_or_default().to_string();
                let obj = RObject::new(RValue::Symbol(name));
                self.refs.push(obj.clone());
                Ok(obj)
            }
            ENVSXP => {
                let _locked = self.buf.read_i32()?;
                // registered before the contents so self-references resolve
                self.refs.push(RObject::new(RValue::Environment));
                let _enclos = self.read_item()?;
                let _frame = self.read_item()?;
                let _hashtab = self.read_item()?;
                let _attrib = self.read_item()?;
                Ok(RObject::new(RValue::Environment))
            }
            LISTSXP | LANGSXP | CLOSXP | PROMSXP | DOTSXP | ATTRLISTSXP | ATTRLANGSXP => {
                self.read_pairlist(flags)
            }
            SPECIALSXP | BUILTINSXP => {
                let len = self.buf.read_i32()?;
                self.buf.read_bytes(len.max(0) as usize)?;
                Ok(RObject::new(RValue::Opaque("builtin")))
            }
            CHARSXP => {
                let s = self.read_charsxp(flags)?;
                Ok(RObject::new(RValue::Character(vec![s])))
            }
            LGLSXP => {
                let len = self.buf.read_count(4)?;
                let mut values = Vec::with_capacity(len);
                for _ in 0..len {
                    let v = self.buf.read_i32()?;
                    values.push((v != NA_INTEGER).then_some(v != 0));
                }
                self.finish_vector(RValue::Logical(values), flags)
            }
            INTSXP => {
                let len = self.buf.read_count(4)?;
                let mut values = Vec::with_capacity(len);
                for _ in 0..len {
                    let v = self.buf.read_i32()?;
                    values.push((v != NA_INTEGER).then_some(v));
                }
                self.finish_vector(RValue::Integer(values), flags)
            }
            REALSXP => {
                let len = self.buf.read_count(8)?;
                let mut values = Vec::with_capacity(len);
                for _ in 0..len {
                    values.push(self.buf.read_f64()?);
                }
                self.finish_vector(RValue::Real(values), flags)
            }
            CPLXSXP => {
                let len = self.buf.read_count(16)?;
                let mut values = Vec::with_capacity(len);
                for _ in 0..len {
                    let re = self.buf.read_f64()?;
                    let im = self.buf.read_f64()?;
                    values.push((re, im));
                }
                self.finish_vector(RValue::Complex(values), flags)
            }
            STRSXP => {
                let len = self.buf.read_count(4)?;
                let mut values = Vec::with_capacity(len);
                for _ in 0..len {
                    let elem = Flags::unpack(self.buf.read_i32()?);
                    if elem.sexp_type != CHARSXP {
                        return Err(RDataError::UnknownType(elem.sexp_type, self.buf.pos()));
                    }
                    values.push(self.read_charsxp(elem)?);
                }
                self.finish_vector(RValue::Character(values), flags)
            }
            VECSXP | EXPRSXP => {
                let len = self.buf.read_count(4)?;
                let mut values = Vec::with_capacity(len);
                for _ in 0..len {
                    values.push(self.read_item()?);
                }
                self.finish_vector(RValue::List(values), flags)
            }
            RAWSXP => {
                let len = self.buf.read_length()?;
                let bytes = self.buf.read_bytes(len)?.to_vec();
                self.finish_vector(RValue::Raw(bytes), flags)
            }
            S4SXP => self.finish_vector(RValue::Opaque("S4"), flags),
            EXTPTRSXP => {
                self.refs.push(RObject::new(RValue::Opaque("externalptr")));
                let _prot = self.read_item()?;
                let _tag = self.read_item()?;
                self.finish_vector(RValue::Opaque("externalptr"), flags)
            }
            WEAKREFSXP => {
                self.refs.push(RObject::new(RValue::Opaque("weakref")));
                self.finish_vector(RValue::Opaque("weakref"), flags)
            }
            ALTREP_SXP => self.read_altrep(),
            BCODESXP | BCREPDEF | BCREPREF => Err(RDataError::Unsupported("bytecode")),
            CLASSREFSXP | GENERICREFSXP => Err(RDataError::Unsupported("class reference")),
            other => Err(RDataError::UnknownType(other, self.buf.pos())),
        }
    }

    /// Attributes trail the payload for every vector type.
    fn finish_vector(&mut self, value: RValue, flags: Flags) -> Result<RObject> {
        let attributes = self.read_attributes(flags)?;
        Ok(RObject { value, attributes })
    }

    fn read_attributes(&mut self, flags: Flags) -> Result<Attributes> {
        if flags.has_attr {
            Ok(self.read_item()?.into_attributes())
        } else {
            Ok(Vec::new())
        }
    }

    /// Cons cells are walked iteratively along the CDR chain.
    fn read_pairlist(&mut self, first: Flags) -> Result<RObject> {
        let kind = first.sexp_type;
        let mut flags = first;
        let mut attributes = Vec::new();
        let mut items = Vec::new();

        loop {
            let attrs = self.read_attributes(flags)?;
            if items.is_empty() {
                attributes = attrs;
            }
            let tag = if flags.has_tag {
                self.read_item()?.as_symbol().map(str::to_string)
            } else {
                None
            };
            let car = self.read_item()?;
            items.push((tag, car));

            let next = Flags::unpack(self.buf.read_i32()?);
            match next.sexp_type {
                LISTSXP | ATTRLISTSXP => flags = next,
                NILVALUE_SXP => break,
                _ => {
                    let tail = self.read_item_with(next)?;
                    items.push((None, tail));
                    break;
                }
            }
        }

        let value = match kind {
            LANGSXP | ATTRLANGSXP => RValue::Opaque("language"),
            CLOSXP => RValue::Opaque("closure"),
            PROMSXP => RValue::Opaque("promise"),
            _ => RValue::PairList(items),
        };
        Ok(RObject { value, attributes })
    }

    fn read_charsxp(&mut self, flags: Flags) -> Result<Option<String>> {
        let len = self.buf.read_i32()?;
        if len == -1 {
            return Ok(None);
        }
        let bytes = self.buf.read_bytes(len.max(0) as usize)?;
        let s = if flags.levels & LATIN1_MASK != 0 {
            bytes.iter().map(|&b| b as char).collect()
        } else {
            String::from_utf8_lossy(bytes).into_owned()
        };
        Ok(Some(s))
    }

    /// `PERSISTSXP` / `PACKAGESXP` payload: a zero word, a length, then CHARSXP items.
    fn read_string_vec(&mut self) -> Result<Vec<Option<String>>> {
        let _zero = self.buf.read_i32()?;
        let len = self.buf.read_count(4)?;
        let mut out = Vec::with_capacity(len);
        for _ in 0..len {
            let item = self.read_item()?;
            out.push(item.as_scalar_string().map(str::to_string));
        }
        Ok(out)
    }

    fn read_altrep(&mut self) -> Result<RObject> {
        let info = self.read_item()?;
        let state = self.read_item()?;
        let attr = self.read_item()?.into_attributes();

        let class = match &info.value {
            RValue::PairList(items) => items
                .first()
                .and_then(|(_, o)| o.as_symbol())
                .unwrap_or_default()
                .to_string(),
            _ => String::new(),
        };
        trace!(class = %class, "altrep");

        let mut obj = expand_altrep(&class, state)?;
        if !attr.is_empty() {
            obj.attributes = attr;
        }
        Ok(obj)
    }
}

fn expand_altrep(class: &str, state: RObject) -> Result<RObject> {
    match class {
        "compact_intseq" => {
            let (n, start, step) = seq_state(&state)?;
            let values = (0..n)
                .map(|i| Some((start as i64 + i * step as i64) as i32))
                .collect();
            Ok(RObject::new(RValue::Integer(values)))
        }
        "compact_realseq" => {
            let (n, start, step) = seq_state(&state)?;
            let values = (0..n).map(|i| start + i as f64 * step).collect();
            Ok(RObject::new(RValue::Real(values)))
        }
        "deferred_string" => {
            let source = match state.value {
                RValue::PairList(mut items) if !items.is_empty() => items.swap_remove(0).1,
                _ => state,
            };
            let values = match &source.value {
                RValue::Integer(v) => v.iter().map(|x| x.map(|i| i.to_string())).collect(),
                RValue::Real(v) => v
                    .iter()
                    .map(|x| (!x.is_nan()).then(|| format_real(*x)))
                    .collect(),
                RValue::Character(v) => v.clone(),
                _ => return Err(RDataError::UnsupportedAltrep(class.to_string())),
            };
            Ok(RObject::new(RValue::Character(values)))
        }
        c if c.starts_with("wrap_") => match state.value {
            RValue::List(mut items) if !items.is_empty() => Ok(items.swap_remove(0)),
            _ => Err(RDataError::UnsupportedAltrep(class.to_string())),
        },
        _ => Err(RDataError::UnsupportedAltrep(class.to_string())),
    }
}

/// Largest compact sequence expanded in memory.
const MAX_SEQ_LEN: i64 = 1 << 28;

/// `(length, start, increment)` triple stored as a double vector.
fn seq_state(state: &RObject) -> Result<(i64, f64, f64)> {
    let RValue::Real(v) = &state.value else {
        return Err(RDataError::Unsupported("malformed compact sequence state"));
    };
    let [n, start, step] = v[..] else {
        return Err(RDataError::Unsupported("malformed compact sequence state"));
    };
    if !n.is_finite() || n < 0.0 || n.fract() != 0.0 || n > MAX_SEQ_LEN as f64 {
        return Err(RDataError::BadLength(if n.is_finite() { n as i64 } else { -1 }));
    }
    Ok((n as i64, start, step))
}

/// Render a double the way `as.character()` does for the common cases.
fn format_real(x: f64) -> String {
    if x.fract() == 0.0 && x.abs() < 1e15 {
        format!("{}", x as i64)
    } else {
        format!("{}", x)
    }
}
