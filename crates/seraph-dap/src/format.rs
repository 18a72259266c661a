//! Display strings for runtime values and types.

use crate::runtime::{Address, ScriptContext, ScriptValue, TypeId, TypeKind};

pub const UNKNOWN_TYPE: &str = "<unknown type>";

/// Name of the runtime's built-in string type.
const STRING_TYPE_NAME: &str = "string";

/// Render `type_id` the way it is declared in script source (`int`, `const Foo@`).
pub fn type_name(context: &dyn ScriptContext, type_id: TypeId) -> String {
    let base = match type_id.kind {
        TypeKind::Void => "void".to_string(),
        TypeKind::Bool => "bool".to_string(),
        TypeKind::Int8 => "int8".to_string(),
        TypeKind::Int16 => "int16".to_string(),
        TypeKind::Int32 => "int".to_string(),
        TypeKind::Int64 => "int64".to_string(),
        TypeKind::UInt8 => "uint8".to_string(),
        TypeKind::UInt16 => "uint16".to_string(),
        TypeKind::UInt32 => "uint".to_string(),
        TypeKind::UInt64 => "uint64".to_string(),
        TypeKind::Float => "float".to_string(),
        TypeKind::Double => "double".to_string(),
        TypeKind::Object(_) => context
            .type_info(type_id)
            .map(|info| info.name)
            .unwrap_or_else(|| UNKNOWN_TYPE.to_string()),
    };

    let mut name = if type_id.const_handle {
        format!("const {base}")
    } else {
        base
    };
    if type_id.handle {
        name.push('@');
    }
    name
}

/// Render the value of type `type_id` stored at `address`.
pub fn format_value(context: &dyn ScriptContext, type_id: TypeId, address: Address) -> String {
    if address == 0 {
        return "null".to_string();
    }

    match type_id.kind {
        TypeKind::Object(_) => {
            let Some(info) = context.type_info(type_id) else {
                return UNKNOWN_TYPE.to_string();
            };
            if info.name == STRING_TYPE_NAME {
                return format_scalar(context.read_value(type_id, address));
            }
            format!("{}@{address}", info.name)
        }
        _ => format_scalar(context.read_value(type_id, address)),
    }
}

fn format_scalar(value: ScriptValue) -> String {
    match value {
        ScriptValue::Null => "null".to_string(),
        ScriptValue::Void => "void".to_string(),
        ScriptValue::Bool(v) => v.to_string(),
        ScriptValue::Int(v) => v.to_string(),
        ScriptValue::UInt(v) => v.to_string(),
        ScriptValue::Float(v) => v.to_string(),
        ScriptValue::Double(v) => v.to_string(),
        ScriptValue::String(v) => format!("\"{v}\""),
        ScriptValue::Unknown => UNKNOWN_TYPE.to_string(),
    }
}
