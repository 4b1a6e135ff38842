//! Rust target: tuples for tensors, `()` for the unit, destructuring
//! directly in the function parameter.

use strand_core::types::Ty;

use super::backend::{Backend, TypeMap};

pub const TARGET: &str = "rust";

pub struct RustBackend;

impl Backend for RustBackend {
    fn target(&self) -> &'static str {
        TARGET
    }

    fn type_name(&self, ty: &Ty, map: &TypeMap) -> Result<String, String> {
        match ty {
            Ty::Base(name) => map.get(name).cloned().ok_or_else(|| name.clone()),
            Ty::Unit => Ok("()".to_owned()),
            Ty::Tensor(l, r) => Ok(format!(
                "({}, {})",
                self.type_name(l, map)?,
                self.type_name(r, map)?
            )),
            Ty::Hom(d, c) => Ok(format!(
                "fn({}) -> {}",
                self.type_name(d, map)?,
                self.type_name(c, map)?
            )),
        }
    }

    fn group_type(&self, parts: &[String]) -> String {
        match parts {
            [] => "()".to_owned(),
            [one] => one.clone(),
            many => format!("({})", many.join(", ")),
        }
    }

    fn call(&self, label: &str, module_prefix: Option<&str>, args: &[String]) -> String {
        let args = args.join(", ");
        match module_prefix {
            Some(prefix) => format!("{prefix}::{label}({args})"),
            None => format!("{label}({args})"),
        }
    }

    fn pattern(&self, parts: &[String]) -> String {
        match parts {
            [] => "()".to_owned(),
            [one] => one.clone(),
            many => format!("({})", many.join(", ")),
        }
    }

    fn bind(&self, pattern: Option<&str>, expr: &str) -> String {
        match pattern {
            Some(pattern) => format!("let {pattern} = {expr};"),
            None => format!("{expr};"),
        }
    }

    fn tuple(&self, parts: &[String]) -> String {
        match parts {
            [] => "()".to_owned(),
            [one] => one.clone(),
            many => format!("({})", many.join(", ")),
        }
    }

    fn function(
        &self,
        name: &str,
        inputs: &[String],
        input_ty: &str,
        output_ty: &str,
        body: &[String],
        ret: &str,
    ) -> String {
        let param = self.pattern(inputs);
        let mut out = format!("pub fn {name}({param}: {input_ty}) -> {output_ty} {{\n");
        for line in body {
            out.push_str("    ");
            out.push_str(line);
            out.push('\n');
        }
        out.push_str("    ");
        out.push_str(ret);
        out.push('\n');
        out.push_str("}\n");
        out
    }
}
