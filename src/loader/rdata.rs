//! Reader for R's XDR serialization format, as written by `saveRDS()` and
//! `save()`. Only the subset needed to recover data frames and atomic
//! vectors is interpreted; closures, language objects and environments are
//! consumed and kept opaque.

use crate::corpus::Table;
use crate::utils::format_number;
use anyhow::{anyhow, bail, Context, Result};
use flate2::read::GzDecoder;
use std::borrow::Cow;
use std::io::Read;

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

const ALTREP_SXP: u8 = 238;
const ATTRLISTSXP: u8 = 239;
const ATTRLANGSXP: u8 = 240;
const BASEENV_SXP: u8 = 241;
const EMPTYENV_SXP: u8 = 242;
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

const HAS_ATTR_BIT: u32 = 1 << 9;
const HAS_TAG_BIT: u32 = 1 << 10;
const LATIN1_MASK: u32 = 1 << 2;

const NA_INTEGER: i32 = i32::MIN;

/// Deepest object nesting accepted before the stream is rejected
const MAX_DEPTH: usize = 256;
/// Longest compact sequence that will be materialized
const MAX_SEQUENCE_LEN: usize = 1 << 28;

/// Decoded payload of an R object
#[derive(Debug, Clone, PartialEq)]
pub enum RValue {
    Null,
    Symbol(String),
    Pairlist(Vec<(Option<String>, RObject)>),
    Logical(Vec<Option<bool>>),
    Integer(Vec<Option<i32>>),
    /// NA and NaN are both `None`
    Real(Vec<Option<f64>>),
    Complex(Vec<Option<(f64, f64)>>),
    Character(Vec<Option<String>>),
    List(Vec<RObject>),
    Raw(Vec<u8>),
    Environment,
    /// Consumed but not interpreted (closures, calls, S4 objects...)
    Opaque(u8),
}

/// An R value together with its attributes
#[derive(Debug, Clone, PartialEq)]
pub struct RObject {
    pub value: RValue,
    pub attributes: Vec<(String, RObject)>,
}

impl RObject {
    pub fn new(value: RValue) -> Self {
        Self {
            value,
            attributes: Vec::new(),
        }
    }

    fn null() -> Self {
        Self::new(RValue::Null)
    }

    pub fn attr(&self, name: &str) -> Option<&RObject> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value)
    }

    /// Entries of the `class` attribute
    pub fn classes(&self) -> Vec<&str> {
        match self.attr("class").map(|c| &c.value) {
            Some(RValue::Character(values)) => values.iter().flatten().map(String::as_str).collect(),
            _ => Vec::new(),
        }
    }

    pub fn inherits(&self, class: &str) -> bool {
        self.classes().contains(&class)
    }

    /// Entries of the `names` attribute, NA names become empty
    pub fn names(&self) -> Option<Vec<String>> {
        match self.attr("names").map(|n| &n.value) {
            Some(RValue::Character(values)) => Some(
                values
                    .iter()
                    .map(|v| v.clone().unwrap_or_default())
                    .collect(),
            ),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        match &self.value {
            RValue::Null | RValue::Symbol(_) | RValue::Environment | RValue::Opaque(_) => 0,
            RValue::Pairlist(items) => items.len(),
            RValue::Logical(v) => v.len(),
            RValue::Integer(v) => v.len(),
            RValue::Real(v) => v.len(),
            RValue::Complex(v) => v.len(),
            RValue::Character(v) => v.len(),
            RValue::List(v) => v.len(),
            RValue::Raw(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Cell text for each element of an atomic vector. Factors are decoded
    /// through their levels; missing values become empty strings.
    pub fn cells(&self) -> Option<Vec<String>> {
        if self.inherits("factor") {
            if let (RValue::Integer(codes), Some(levels)) = (&self.value, self.attr("levels")) {
                let levels = levels.cells()?;
                return Some(
                    codes
                        .iter()
                        .map(|code| {
                            code.and_then(|c| usize::try_from(c - 1).ok())
                                .and_then(|i| levels.get(i).cloned())
                                .unwrap_or_default()
                        })
                        .collect(),
                );
            }
        }

        let cells = match &self.value {
            RValue::Logical(v) => v
                .iter()
                .map(|x| match x {
                    Some(true) => "TRUE".to_string(),
                    Some(false) => "FALSE".to_string(),
                    None => String::new(),
                })
                .collect(),
            RValue::Integer(v) => v
                .iter()
                .map(|x| x.map(|i| i.to_string()).unwrap_or_default())
                .collect(),
            RValue::Real(v) => v
                .iter()
                .map(|x| x.map(format_number).unwrap_or_default())
                .collect(),
            RValue::Complex(v) => v
                .iter()
                .map(|x| {
                    x.map(|(re, im)| {
                        let sign = if im < 0.0 { '-' } else { '+' };
                        format!("{}{}{}i", format_number(re), sign, format_number(im.abs()))
                    })
                    .unwrap_or_default()
                })
                .collect(),
            RValue::Character(v) => v.iter().map(|x| x.clone().unwrap_or_default()).collect(),
            RValue::Raw(v) => v.iter().map(|b| format!("{b:02x}")).collect(),
            _ => return None,
        };
        Some(cells)
    }
}

/// Inflate gzip-compressed input; plain input is returned as is
pub fn decompress(bytes: &[u8]) -> Result<Cow<'_, [u8]>> {
    match bytes {
        [0x1f, 0x8b, ..] => {
            let mut out = Vec::new();
            GzDecoder::new(bytes)
                .read_to_end(&mut out)
                .context("Failed to decompress gzip stream")?;
            Ok(Cow::Owned(out))
        }
        [b'B', b'Z', b'h', ..] => bail!("bzip2-compressed R files are not supported"),
        [0xfd, b'7', b'z', b'X', b'Z', ..] => bail!("xz-compressed R files are not supported"),
        _ => Ok(Cow::Borrowed(bytes)),
    }
}

/// Parse a single serialized object (`.rds`)
pub fn parse_rds(bytes: &[u8]) -> Result<RObject> {
    let data = decompress(bytes)?;
    let mut reader = XdrReader::new(&data);
    reader.read_header()?;
    reader.read_item()
}

/// Parse a saved workspace (`.RData`, `.rda`) into its named objects
pub fn parse_rdata(bytes: &[u8]) -> Result<Vec<(String, RObject)>> {
    let data = decompress(bytes)?;
    let stream = match data.get(..5) {
        Some(b"RDX2\n") | Some(b"RDX3\n") => &data[5..],
        Some(b"RDA2\n") | Some(b"RDA3\n") | Some(b"RDB2\n") | Some(b"RDB3\n") => {
            bail!("only XDR workspace files are supported")
        }
        _ => bail!("not an R workspace file (missing RDX header)"),
    };

    let mut reader = XdrReader::new(stream);
    reader.read_header()?;
    let root = reader.read_item()?;

    match root.value {
        RValue::Pairlist(items) => Ok(items
            .into_iter()
            .enumerate()
            .map(|(i, (tag, obj))| (tag.unwrap_or_else(|| format!("object_{}", i + 1)), obj))
            .collect()),
        RValue::Null => Ok(Vec::new()),
        _ => bail!("workspace does not contain a list of objects"),
    }
}

/// Convert a data frame or atomic vector to a table
pub fn object_to_table(name: &str, obj: &RObject) -> Option<Table> {
    if obj.inherits("data.frame") {
        let RValue::List(columns) = &obj.value else {
            return None;
        };
        let headers = obj.names().unwrap_or_default();
        let cells: Vec<Vec<String>> = columns
            .iter()
            .map(|col| col.cells().unwrap_or_else(|| vec![String::new(); col.len()]))
            .collect();
        let nrow = cells.iter().map(Vec::len).max().unwrap_or(0);

        let mut table = Table::new((0..columns.len()).map(|i| headers.get(i).cloned().unwrap_or_default()));
        for row in 0..nrow {
            table.push_row(
                cells
                    .iter()
                    .map(|col| col.get(row).cloned().unwrap_or_default())
                    .collect(),
            );
        }
        return Some(table);
    }

    let cells = obj.cells()?;
    let mut table = Table::new([name]);
    for cell in cells {
        table.push_row(vec![cell]);
    }
    Some(table)
}

struct XdrReader<'a> {
    data: &'a [u8],
    pos: usize,
    refs: Vec<RObject>,
    depth: usize,
}

impl<'a> XdrReader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            pos: 0,
            refs: Vec::new(),
            depth: 0,
        }
    }

    fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    fn read_bytes(&mut self, n: usize) -> Result<&'a [u8]> {
        if n > self.remaining() {
            bail!("unexpected end of R data at byte {}", self.pos);
        }
        let slice = &self.data[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn read_i32(&mut self) -> Result<i32> {
        let b = self.read_bytes(4)?;
        Ok(i32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    fn read_f64(&mut self) -> Result<f64> {
        let b = self.read_bytes(8)?;
        let mut buf = [0u8; 8];
        buf.copy_from_slice(b);
        Ok(f64::from_be_bytes(buf))
    }

    fn read_length(&mut self) -> Result<usize> {
        let len = self.read_i32()?;
        if len == -1 {
            let upper = u64::from(self.read_i32()? as u32);
            let lower = u64::from(self.read_i32()? as u32);
            usize::try_from((upper << 32) + lower).context("vector too long")
        } else {
            usize::try_from(len).map_err(|_| anyhow!("negative vector length {len}"))
        }
    }

    /// Length of a vector whose elements take at least `min_size` bytes
    fn read_vector_length(&mut self, min_size: usize) -> Result<usize> {
        let len = self.read_length()?;
        if len.saturating_mul(min_size) > self.remaining() {
            bail!("vector length {len} exceeds remaining data");
        }
        Ok(len)
    }

    fn read_header(&mut self) -> Result<()> {
        match self.read_bytes(2)? {
            b"X\n" => {}
            b"A\n" => bail!("ASCII R serialization is not supported"),
            b"B\n" => bail!("native binary R serialization is not supported"),
            _ => bail!("not an R serialization stream"),
        }

        let version = self.read_i32()?;
        let _writer_version = self.read_i32()?;
        let _min_reader_version = self.read_i32()?;
        match version {
            2 => {}
            3 => {
                let len = self.read_length()?;
                let _native_encoding = self.read_bytes(len)?;
            }
            other => bail!("unsupported R serialization version {other}"),
        }
        Ok(())
    }

    fn read_item(&mut self) -> Result<RObject> {
        let flags = self.read_i32()? as u32;
        self.read_item_with_flags(flags)
    }

    fn read_item_with_flags(&mut self, flags: u32) -> Result<RObject> {
        if self.depth >= MAX_DEPTH {
            bail!("R object nesting exceeds {MAX_DEPTH} levels at byte {}", self.pos);
        }
        self.depth += 1;
        let result = self.read_node(flags);
        self.depth -= 1;
        result
    }

    fn read_node(&mut self, flags: u32) -> Result<RObject> {
        let sexp_type = (flags & 0xFF) as u8;
        let has_attr = flags & HAS_ATTR_BIT != 0;

        let value = match sexp_type {
            NILVALUE_SXP | NILSXP | UNBOUNDVALUE_SXP | MISSINGARG_SXP => return Ok(RObject::null()),
            EMPTYENV_SXP | BASEENV_SXP | GLOBALENV_SXP | BASENAMESPACE_SXP => {
                return Ok(RObject::new(RValue::Environment))
            }
            REFSXP => {
                let index = match (flags >> 8) as usize {
                    0 => usize::try_from(self.read_i32()?).context("invalid reference index")?,
                    packed => packed,
                };
                return index
                    .checked_sub(1)
                    .and_then(|i| self.refs.get(i))
                    .cloned()
                    .ok_or_else(|| anyhow!("dangling reference {index}"));
            }
            PERSISTSXP => {
                let names = self.read_string_vec()?;
                let obj = RObject::new(RValue::Character(names));
                self.refs.push(obj.clone());
                return Ok(obj);
            }
            PACKAGESXP | NAMESPACESXP => {
                self.read_string_vec()?;
                let obj = RObject::new(RValue::Environment);
                self.refs.push(obj.clone());
                return Ok(obj);
            }
            SYMSXP => {
                let name = self.read_item()?;
                let name = match name.value {
                    RValue::Character(mut v) if v.len() == 1 => v.pop().flatten().unwrap_or_default(),
                    _ => bail!("symbol name is not a string"),
                };
                let obj = RObject::new(RValue::Symbol(name));
                self.refs.push(obj.clone());
                return Ok(obj);
            }
            ENVSXP => {
                let _locked = self.read_i32()?;
                self.refs.push(RObject::new(RValue::Environment));
                let _enclosure = self.read_item()?;
                let _frame = self.read_item()?;
                let _hashtab = self.read_item()?;
                let _attributes = self.read_item()?;
                return Ok(RObject::new(RValue::Environment));
            }
            LISTSXP | LANGSXP | CLOSXP | PROMSXP | DOTSXP | ATTRLANGSXP | ATTRLISTSXP => {
                return self.read_pairlist(flags)
            }
            ALTREP_SXP => {
                let info = self.read_item()?;
                let state = self.read_item()?;
                let attributes = self.read_item()?;
                let mut obj = expand_altrep(&info, state)?;
                obj.attributes = into_attributes(attributes);
                return Ok(obj);
            }
            CHARSXP => {
                let len = self.read_i32()?;
                if len == -1 {
                    RValue::Character(vec![None])
                } else {
                    let len = usize::try_from(len).map_err(|_| anyhow!("negative string length {len}"))?;
                    let bytes = self.read_bytes(len)?;
                    let levels = flags >> 12;
                    let text = if levels & LATIN1_MASK != 0 {
                        bytes.iter().map(|&b| char::from(b)).collect()
                    } else {
                        String::from_utf8_lossy(bytes).into_owned()
                    };
                    RValue::Character(vec![Some(text)])
                }
            }
            SPECIALSXP | BUILTINSXP => {
                let len = self.read_vector_length(1)?;
                self.read_bytes(len)?;
                RValue::Opaque(sexp_type)
            }
            EXTPTRSXP => {
                self.refs.push(RObject::new(RValue::Opaque(sexp_type)));
                let _protected = self.read_item()?;
                let _tag = self.read_item()?;
                RValue::Opaque(sexp_type)
            }
            WEAKREFSXP => {
                self.refs.push(RObject::new(RValue::Opaque(sexp_type)));
                RValue::Opaque(sexp_type)
            }
            LGLSXP => {
                let len = self.read_vector_length(4)?;
                let mut values = Vec::with_capacity(len);
                for _ in 0..len {
                    let v = self.read_i32()?;
                    values.push((v != NA_INTEGER).then_some(v != 0));
                }
                RValue::Logical(values)
            }
            INTSXP => {
                let len = self.read_vector_length(4)?;
                let mut values = Vec::with_capacity(len);
                for _ in 0..len {
                    let v = self.read_i32()?;
                    values.push((v != NA_INTEGER).then_some(v));
                }
                RValue::Integer(values)
            }
            REALSXP => {
                let len = self.read_vector_length(8)?;
                let mut values = Vec::with_capacity(len);
                for _ in 0..len {
                    let v = self.read_f64()?;
                    values.push((!v.is_nan()).then_some(v));
                }
                RValue::Real(values)
            }
            CPLXSXP => {
                let len = self.read_vector_length(16)?;
                let mut values = Vec::with_capacity(len);
                for _ in 0..len {
                    let re = self.read_f64()?;
                    let im = self.read_f64()?;
                    values.push((!re.is_nan() && !im.is_nan()).then_some((re, im)));
                }
                RValue::Complex(values)
            }
            STRSXP => {
                let len = self.read_vector_length(4)?;
                let mut values = Vec::with_capacity(len);
                for _ in 0..len {
                    match self.read_item()?.value {
                        RValue::Character(mut v) if v.len() == 1 => values.push(v.pop().flatten()),
                        _ => bail!("character vector element is not a string"),
                    }
                }
                RValue::Character(values)
            }
            VECSXP | EXPRSXP => {
                let len = self.read_vector_length(4)?;
                let mut items = Vec::with_capacity(len);
                for _ in 0..len {
                    items.push(self.read_item()?);
                }
                RValue::List(items)
            }
            RAWSXP => {
                let len = self.read_vector_length(1)?;
                RValue::Raw(self.read_bytes(len)?.to_vec())
            }
            S4SXP => RValue::Opaque(sexp_type),
            BCODESXP => bail!("byte-compiled code objects are not supported"),
            CLASSREFSXP | GENERICREFSXP => bail!("reference class objects are not supported"),
            other => bail!("unknown R object type {other}"),
        };

        let attributes = if has_attr {
            into_attributes(self.read_item()?)
        } else {
            Vec::new()
        };
        Ok(RObject { value, attributes })
    }

    /// Pairlist-shaped objects, read iteratively along the CDR chain
    fn read_pairlist(&mut self, flags: u32) -> Result<RObject> {
        let head_type = (flags & 0xFF) as u8;
        let mut flags = flags;
        let mut items = Vec::new();
        let mut attributes = Vec::new();

        loop {
            if flags & HAS_ATTR_BIT != 0 {
                let attrs = into_attributes(self.read_item()?);
                if items.is_empty() {
                    attributes = attrs;
                }
            }
            let tag = if flags & HAS_TAG_BIT != 0 {
                match self.read_item()?.value {
                    RValue::Symbol(name) => Some(name),
                    _ => None,
                }
            } else {
                None
            };
            let car = self.read_item()?;
            items.push((tag, car));

            let next = self.read_i32()? as u32;
            match (next & 0xFF) as u8 {
                NILVALUE_SXP => break,
                LISTSXP | LANGSXP | CLOSXP | PROMSXP | DOTSXP | ATTRLANGSXP | ATTRLISTSXP => {
                    flags = next;
                }
                _ => {
                    let cdr = self.read_item_with_flags(next)?;
                    items.push((None, cdr));
                    break;
                }
            }
        }

        let value = match head_type {
            LISTSXP | ATTRLISTSXP | DOTSXP => RValue::Pairlist(items),
            other => RValue::Opaque(other),
        };
        Ok(RObject { value, attributes })
    }

    /// Persistent names and namespace specs
    fn read_string_vec(&mut self) -> Result<Vec<Option<String>>> {
        if self.read_i32()? != 0 {
            bail!("invalid string vector header");
        }
        let len = self.read_vector_length(4)?;
        let mut values = Vec::with_capacity(len);
        for _ in 0..len {
            match self.read_item()?.value {
                RValue::Character(mut v) if v.len() == 1 => values.push(v.pop().flatten()),
                _ => bail!("string vector element is not a string"),
            }
        }
        Ok(values)
    }
}

fn into_attributes(obj: RObject) -> Vec<(String, RObject)> {
    match obj.value {
        RValue::Pairlist(items) => items
            .into_iter()
            .filter_map(|(tag, value)| tag.map(|t| (t, value)))
            .collect(),
        _ => Vec::new(),
    }
}

/// Materialize the ALTREP classes R writes for compact sequences and
/// wrapped vectors
fn expand_altrep(info: &RObject, state: RObject) -> Result<RObject> {
    let class = match &info.value {
        RValue::Pairlist(items) => match items.first().map(|(_, v)| &v.value) {
            Some(RValue::Symbol(name)) => name.clone(),
            _ => bail!("malformed ALTREP class information"),
        },
        _ => bail!("malformed ALTREP class information"),
    };

    match class.as_str() {
        "compact_intseq" => {
            let (n, start, step) = sequence_state(&state)?;
            let values = expand_sequence(n, |i| Some((start + step * i as f64) as i32))?;
            Ok(RObject::new(RValue::Integer(values)))
        }
        "compact_realseq" => {
            let (n, start, step) = sequence_state(&state)?;
            let values = expand_sequence(n, |i| Some(start + step * i as f64))?;
            Ok(RObject::new(RValue::Real(values)))
        }
        "deferred_string" => {
            let source = match state.value {
                RValue::Pairlist(mut items) if !items.is_empty() => items.swap_remove(0).1,
                _ => bail!("malformed deferred string state"),
            };
            let cells = source
                .cells()
                .ok_or_else(|| anyhow!("deferred string source is not atomic"))?;
            Ok(RObject::new(RValue::Character(cells.into_iter().map(Some).collect())))
        }
        wrapper if wrapper.starts_with("wrap_") => match state.value {
            RValue::Pairlist(mut items) if !items.is_empty() => Ok(items.swap_remove(0).1),
            RValue::List(mut items) if !items.is_empty() => Ok(items.swap_remove(0)),
            _ => bail!("malformed {wrapper} state"),
        },
        other => bail!("unsupported ALTREP class {other}"),
    }
}

fn sequence_state(state: &RObject) -> Result<(usize, f64, f64)> {
    let v = match &state.value {
        RValue::Real(v) if v.len() == 3 => v,
        _ => bail!("malformed compact sequence state"),
    };
    let n = v[0]
        .filter(|n| n.is_finite() && *n >= 0.0)
        .ok_or_else(|| anyhow!("invalid compact sequence length"))?;
    if n > MAX_SEQUENCE_LEN as f64 {
        bail!("compact sequence length {n} exceeds the limit of {MAX_SEQUENCE_LEN}");
    }
    let start = v[1].unwrap_or(0.0);
    let step = v[2].unwrap_or(1.0);
    Ok((n as usize, start, step))
}

fn expand_sequence<T>(n: usize, value_at: impl Fn(usize) -> T) -> Result<Vec<T>> {
    let mut values = Vec::new();
    values
        .try_reserve_exact(n)
        .map_err(|_| anyhow!("cannot allocate compact sequence of length {n}"))?;
    values.extend((0..n).map(value_at));
    Ok(values)
}
