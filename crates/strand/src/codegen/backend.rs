//! The backend strategy trait.
//!
//! A backend is a small, swappable syntax renderer: type names, call
//! expressions, bindings, and tuple grouping. The topological ordering
//! and the binding plan are target-independent and live in the parent
//! module; adding a target means implementing this trait only.

use indexmap::IndexMap;

use strand_core::types::Ty;

/// Base-type name mapping for one generation run, in declaration order.
pub type TypeMap = IndexMap<String, String>;

pub trait Backend {
    /// The target identifier this backend is registered under.
    fn target(&self) -> &'static str;

    /// `false` when the target lacks first-class multi-value returns;
    /// multi-output nodes are then unsupported constructs.
    fn supports_multi_value(&self) -> bool {
        true
    }

    /// Renders a type. `Err` carries the name of an unmapped base type.
    fn type_name(&self, ty: &Ty, map: &TypeMap) -> Result<String, String>;

    /// Groups pre-rendered type names the way the boundary groups
    /// values: none is the unit type, one is bare, more is a tuple.
    fn group_type(&self, parts: &[String]) -> String;

    /// Renders a call of a registered morphism.
    fn call(&self, label: &str, module_prefix: Option<&str>, args: &[String]) -> String;

    /// A destructuring pattern over pre-rendered parts (one part is
    /// bare, so patterns nest).
    fn pattern(&self, parts: &[String]) -> String;

    /// One binding statement; `None` discards the value.
    fn bind(&self, pattern: Option<&str>, expr: &str) -> String;

    /// A value grouping: none is the unit value, one is bare, more is
    /// a tuple.
    fn tuple(&self, parts: &[String]) -> String;

    /// Wraps the body into a complete function definition. `inputs`
    /// are the prologue names for the boundary input components.
    fn function(
        &self,
        name: &str,
        inputs: &[String],
        input_ty: &str,
        output_ty: &str,
        body: &[String],
        ret: &str,
    ) -> String;
}
