//! Go-syntax rendering of types, as printed by `%T` and in diagnostics.

#![allow(clippy::format_push_string)]

use crate::{ChanDir, Idx, Pool, Tag};

impl Pool {
    /// Format a type the way Go prints it.
    pub fn format_type(&self, idx: Idx) -> String {
        let mut buf = String::new();
        self.format_type_into(idx, &mut buf);
        buf
    }

    /// Format a type into an existing string buffer.
    pub fn format_type_into(&self, idx: Idx, buf: &mut String) {
        if idx.is_none() {
            buf.push_str("<none>");
            return;
        }
        let tag = self.tag(idx);
        if tag.is_basic() {
            buf.push_str(tag.name());
            return;
        }
        match tag {
            Tag::Pointer => {
                buf.push('*');
                self.format_type_into(self.item(idx).child(), buf);
            }
            Tag::Slice => {
                buf.push_str("[]");
                self.format_type_into(self.item(idx).child(), buf);
            }
            Tag::Array => {
                buf.push_str(&format!("[{}]", self.array_len(idx)));
                self.format_type_into(self.elem(idx), buf);
            }
            Tag::Map => {
                buf.push_str("map[");
                self.format_type_into(self.key(idx), buf);
                buf.push(']');
                self.format_type_into(self.elem(idx), buf);
            }
            Tag::Chan => {
                let elem = self.elem(idx);
                match self.chan_dir(idx) {
                    ChanDir::Both => buf.push_str("chan "),
                    ChanDir::Send => buf.push_str("chan<- "),
                    ChanDir::Recv => buf.push_str("<-chan "),
                }
                // `chan (<-chan int)` needs parentheses to stay unambiguous.
                let paren = self.tag(elem) == Tag::Chan && self.chan_dir(elem) == ChanDir::Recv;
                if paren {
                    buf.push('(');
                }
                self.format_type_into(elem, buf);
                if paren {
                    buf.push(')');
                }
            }
            Tag::Struct => {
                buf.push_str("struct{");
                for (i, f) in self.fields(idx).iter().enumerate() {
                    if i > 0 {
                        buf.push_str("; ");
                    }
                    if !f.embedded {
                        buf.push_str(self.name_str(f.name));
                        buf.push(' ');
                    }
                    self.format_type_into(f.ty, buf);
                    if !f.tag.is_empty() {
                        buf.push_str(&format!(" {:?}", self.name_str(f.tag)));
                    }
                }
                buf.push('}');
            }
            Tag::Interface => {
                buf.push_str("interface{");
                let methods = self.interface_methods(idx);
                for (i, m) in methods.iter().enumerate() {
                    if i > 0 {
                        buf.push_str("; ");
                    }
                    buf.push_str(self.name_str(m.name));
                    self.format_signature_into(m.sig, buf);
                }
                let set = self.interface_type_set(idx);
                if !set.is_none() {
                    if !methods.is_empty() {
                        buf.push_str("; ");
                    }
                    self.format_type_into(set, buf);
                }
                buf.push('}');
            }
            Tag::Signature => {
                buf.push_str("func");
                self.format_signature_into(idx, buf);
            }
            Tag::Tuple => {
                buf.push('(');
                self.format_list_into(&self.tuple_elems(idx), buf);
                buf.push(')');
            }
            Tag::Union => {
                for (i, t) in self.union_terms(idx).iter().enumerate() {
                    if i > 0 {
                        buf.push_str(" | ");
                    }
                    if t.tilde {
                        buf.push('~');
                    }
                    self.format_type_into(t.ty, buf);
                }
            }
            Tag::Named => {
                let info = self.named_info(idx);
                if !info.pkg.is_empty() {
                    buf.push_str(self.name_str(info.pkg));
                    buf.push('.');
                }
                buf.push_str(self.name_str(info.name));
                if !info.type_args.is_empty() {
                    buf.push('[');
                    for (i, &a) in info.type_args.iter().enumerate() {
                        if i > 0 {
                            buf.push(',');
                        }
                        self.format_type_into(a, buf);
                    }
                    buf.push(']');
                }
            }
            Tag::TypeParam => buf.push_str(self.name_str(self.type_param_info(idx).name)),
            _ => buf.push_str(tag.name()),
        }
    }

    /// `(params) results` without the leading `func`.
    fn format_signature_into(&self, sig: Idx, buf: &mut String) {
        let params = self.params(sig);
        let variadic = self.is_variadic(sig);
        buf.push('(');
        for (i, &p) in params.iter().enumerate() {
            if i > 0 {
                buf.push_str(", ");
            }
            if variadic && i + 1 == params.len() {
                buf.push_str("...");
                self.format_type_into(self.elem(p), buf);
            } else {
                self.format_type_into(p, buf);
            }
        }
        buf.push(')');

        let results = self.results(sig);
        match results.as_slice() {
            [] => {}
            [single] => {
                buf.push(' ');
                self.format_type_into(*single, buf);
            }
            many => {
                buf.push_str(" (");
                self.format_list_into(many, buf);
                buf.push(')');
            }
        }
    }

    fn format_list_into(&self, list: &[Idx], buf: &mut String) {
        for (i, &t) in list.iter().enumerate() {
            if i > 0 {
                buf.push_str(", ");
            }
            self.format_type_into(t, buf);
        }
    }
}
