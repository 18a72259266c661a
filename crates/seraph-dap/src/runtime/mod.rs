//! Boundary between the debugger and the script runtime.
//!
//! The runtime owns execution and memory. The debugger only ever sees a paused
//! call stack through [`ScriptContext`], and reads values through
//! [`ScriptContext::read_value`] so raw addresses never get dereferenced on
//! this side of the boundary.

mod hooks;
mod mock;
mod timer;

pub use hooks::{LineHook, LineHooks};
pub use mock::{MockFrame, MockScriptContext};
pub use timer::CallTimer;

/// Opaque address of a value inside the runtime. `0` is the null address.
pub type Address = usize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TypeKind {
    Void,
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float,
    Double,
    /// A registered script or application type, resolved via [`ScriptContext::type_info`].
    Object(u32),
}

/// Runtime type identifier: a base kind plus handle qualifiers.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TypeId {
    pub kind: TypeKind,
    pub handle: bool,
    pub const_handle: bool,
}

impl TypeId {
    pub const fn of(kind: TypeKind) -> Self {
        Self {
            kind,
            handle: false,
            const_handle: false,
        }
    }

    pub const fn object(id: u32) -> Self {
        Self::of(TypeKind::Object(id))
    }

    pub const fn as_handle(self) -> Self {
        Self {
            handle: true,
            ..self
        }
    }

    pub const fn as_const_handle(self) -> Self {
        Self {
            handle: true,
            const_handle: true,
            ..self
        }
    }
}

/// A value decoded by the runtime.
#[derive(Clone, Debug, PartialEq)]
pub enum ScriptValue {
    Null,
    Void,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f32),
    Double(f64),
    String(String),
    Unknown,
}

/// Bound receiver or registered object: a type plus where it lives.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ObjectRef {
    pub type_id: TypeId,
    pub address: Address,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LineInfo {
    pub line: u32,
    pub column: u32,
    /// Script section (source path) the line belongs to.
    pub section: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocalVar {
    pub name: String,
    pub type_id: TypeId,
    pub address: Address,
    pub in_scope: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GlobalVar {
    pub name: String,
    pub type_id: TypeId,
    pub address: Address,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PropertyInfo {
    pub name: String,
    pub type_id: TypeId,
    /// Byte offset of the property from the object's base address.
    pub offset: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeInfo {
    pub name: String,
    pub properties: Vec<PropertyInfo>,
}

/// Live view of one executing script call stack.
///
/// Frame `0` is the innermost (currently executing) frame. Implementations are
/// queried from the transport thread while the script thread is blocked inside
/// the line hook, hence `Send + Sync`.
pub trait ScriptContext: Send + Sync {
    fn callstack_size(&self) -> u32;

    fn line_info(&self, frame: u32) -> LineInfo;

    fn function_name(&self, frame: u32) -> Option<String>;

    /// Receiver object bound to the frame's method, if any.
    fn this_object(&self, frame: u32) -> Option<ObjectRef>;

    fn locals(&self, frame: u32) -> Vec<LocalVar>;

    /// Globals of the module that owns the frame's function.
    fn module_globals(&self, frame: u32) -> Vec<GlobalVar>;

    fn type_info(&self, type_id: TypeId) -> Option<TypeInfo>;

    /// Decode the value of type `type_id` stored at `address`.
    fn read_value(&self, type_id: TypeId, address: Address) -> ScriptValue;
}
