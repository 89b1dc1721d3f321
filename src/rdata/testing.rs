//! Minimal XDR stream builder used to fabricate `.rda` payloads in tests.

const LISTSXP: i32 = 2;
const SYMSXP: i32 = 1;
const CHARSXP: i32 = 9;
const LGLSXP: i32 = 10;
const INTSXP: i32 = 13;
const REALSXP: i32 = 14;
const STRSXP: i32 = 16;
const VECSXP: i32 = 19;
const ALTREP_SXP: i32 = 238;
const REFSXP: i32 = 255;
const NILVALUE_SXP: i32 = 254;

const IS_OBJECT: i32 = 1 << 8;
const HAS_ATTR: i32 = 1 << 9;
const HAS_TAG: i32 = 1 << 10;
const ASCII_LEVEL: i32 = 64 << 12;

pub struct XdrWriter {
    out: Vec<u8>,
}

impl XdrWriter {
    pub fn rdx2() -> Self {
        let mut w = Self {
            out: b"RDX2\nX\n".to_vec(),
        };
        w.i32(2);
        w.i32(0x0004_0201);
        w.i32(0x0002_0300);
        w
    }

    pub fn rdx3() -> Self {
        let mut w = Self {
            out: b"RDX3\nX\n".to_vec(),
        };
        w.i32(3);
        w.i32(0x0004_0201);
        w.i32(0x0003_0500);
        w.i32(5);
        w.out.extend_from_slice(b"UTF-8");
        w
    }

    pub fn finish(self) -> Vec<u8> {
        self.out
    }

    pub fn finish_gzip(self) -> Vec<u8> {
        use std::io::Write;
        let mut enc = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
        enc.write_all(&self.out).expect("in-memory write");
        enc.finish().expect("in-memory gzip")
    }

    pub fn i32(&mut self, v: i32) {
        self.out.extend_from_slice(&v.to_be_bytes());
    }

    fn f64(&mut self, v: f64) {
        self.out.extend_from_slice(&v.to_be_bytes());
    }

    fn flags(&mut self, ty: i32, has_attr: bool, has_tag: bool) {
        let mut f = ty;
        if has_attr {
            f |= HAS_ATTR | IS_OBJECT;
        }
        if has_tag {
            f |= HAS_TAG;
        }
        self.i32(f);
    }

    pub fn nil(&mut self) {
        self.i32(NILVALUE_SXP);
    }

    pub fn pairlist_node(&mut self, has_tag: bool, has_attr: bool) {
        self.flags(LISTSXP, has_attr, has_tag);
    }

    pub fn reference(&mut self, index: i32) {
        self.i32((index << 8) | REFSXP);
    }

    fn charsxp(&mut self, s: Option<&str>) {
        self.i32(CHARSXP | ASCII_LEVEL);
        match s {
            Some(s) => {
                self.i32(s.len() as i32);
                self.out.extend_from_slice(s.as_bytes());
            }
            None => self.i32(-1),
        }
    }

    pub fn symbol(&mut self, name: &str) {
        self.i32(SYMSXP);
        self.charsxp(Some(name));
    }

    pub fn lgl_vector(&mut self, values: &[Option<bool>], has_attr: bool) {
        self.flags(LGLSXP, has_attr, false);
        self.i32(values.len() as i32);
        for v in values {
            self.i32(match v {
                Some(true) => 1,
                Some(false) => 0,
                None => i32::MIN,
            });
        }
    }

    pub fn int_vector(&mut self, values: &[Option<i32>], has_attr: bool) {
        self.flags(INTSXP, has_attr, false);
        self.i32(values.len() as i32);
        for v in values {
            self.i32(v.unwrap_or(i32::MIN));
        }
    }

    pub fn real_vector(&mut self, values: &[f64], has_attr: bool) {
        self.flags(REALSXP, has_attr, false);
        self.i32(values.len() as i32);
        for v in values {
            self.f64(*v);
        }
    }

    pub fn str_vector(&mut self, values: &[Option<&str>], has_attr: bool) {
        self.flags(STRSXP, has_attr, false);
        self.i32(values.len() as i32);
        for v in values {
            self.charsxp(*v);
        }
    }

    /// Header only; the caller writes `len` items and then the attributes.
    pub fn list_header(&mut self, len: usize, has_attr: bool) {
        self.flags(VECSXP, has_attr, false);
        self.i32(len as i32);
    }

    pub fn altrep_compact_intseq(&mut self, n: i32, start: i32, step: i32) {
        self.i32(ALTREP_SXP);
        self.pairlist_node(false, false);
        self.symbol("compact_intseq");
        self.pairlist_node(false, false);
        self.symbol("base");
        self.pairlist_node(false, false);
        self.int_vector(&[Some(INTSXP)], false);
        self.nil();
        self.real_vector(&[n as f64, start as f64, step as f64], false);
        self.nil();
    }

    /// Attribute pairlist entry `name = c(values)`; call `nil()` after the last one.
    pub fn str_attr(&mut self, name: &str, values: &[&str]) {
        self.pairlist_node(true, false);
        self.symbol(name);
        let values: Vec<Option<&str>> = values.iter().map(|v| Some(*v)).collect();
        self.str_vector(&values, false);
    }

    /// Compact `row.names = c(NA, -n)` attribute entry.
    pub fn compact_row_names(&mut self, n: i32) {
        self.pairlist_node(true, false);
        self.symbol("row.names");
        self.int_vector(&[None, Some(-n)], false);
    }
}

/// R's `NA_real_` bit pattern.
pub fn na_real() -> f64 {
    f64::from_bits(0x7ff0_0000_0000_07a2)
}
