//! Python target: `tuple[..]` annotations, `None` for the unit,
//! tuple unpacking in a prologue line.

use strand_core::types::Ty;

use super::backend::{Backend, TypeMap};

pub const TARGET: &str = "python";

pub struct PythonBackend;

impl Backend for PythonBackend {
    fn target(&self) -> &'static str {
        TARGET
    }

    fn type_name(&self, ty: &Ty, map: &TypeMap) -> Result<String, String> {
        match ty {
            Ty::Base(name) => map.get(name).cloned().ok_or_else(|| name.clone()),
            Ty::Unit => Ok("None".to_owned()),
            Ty::Tensor(l, r) => Ok(format!(
                "tuple[{}, {}]",
                self.type_name(l, map)?,
                self.type_name(r, map)?
            )),
            Ty::Hom(d, c) => Ok(format!(
                "Callable[[{}], {}]",
                self.type_name(d, map)?,
                self.type_name(c, map)?
            )),
        }
    }

    fn group_type(&self, parts: &[String]) -> String {
        match parts {
            [] => "None".to_owned(),
            [one] => one.clone(),
            many => format!("tuple[{}]", many.join(", ")),
        }
    }

    fn call(&self, label: &str, module_prefix: Option<&str>, args: &[String]) -> String {
        let args = args.join(", ");
        match module_prefix {
            Some(prefix) => format!("{prefix}.{label}({args})"),
            None => format!("{label}({args})"),
        }
    }

    fn pattern(&self, parts: &[String]) -> String {
        match parts {
            [] => "_".to_owned(),
            [one] => one.clone(),
            many => format!("({})", many.join(", ")),
        }
    }

    fn bind(&self, pattern: Option<&str>, expr: &str) -> String {
        match pattern {
            Some(pattern) => format!("{pattern} = {expr}"),
            None => expr.to_owned(),
        }
    }

    fn tuple(&self, parts: &[String]) -> String {
        match parts {
            [] => "None".to_owned(),
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
        let mut out = format!("def {name}(input: {input_ty}) -> {output_ty}:\n");
        if !inputs.is_empty() {
            out.push_str("    ");
            out.push_str(&self.bind(Some(&self.pattern(inputs)), "input"));
            out.push('\n');
        }
        for line in body {
            out.push_str("    ");
            out.push_str(line);
            out.push('\n');
        }
        out.push_str("    return ");
        out.push_str(ret);
        out.push('\n');
        out
    }
}
