use std::collections::HashMap;

use parking_lot::Mutex;

use super::{
    Address, GlobalVar, LineInfo, LocalVar, ObjectRef, ScriptContext, ScriptValue, TypeId,
    TypeInfo, TypeKind,
};

/// One activation record of a [`MockScriptContext`].
#[derive(Clone, Debug, Default)]
pub struct MockFrame {
    pub function: Option<String>,
    pub section: Option<String>,
    pub line: u32,
    pub column: u32,
    pub this: Option<ObjectRef>,
    pub locals: Vec<LocalVar>,
}

impl MockFrame {
    pub fn new(function: &str, section: &str, line: u32) -> Self {
        Self {
            function: Some(function.to_string()),
            section: Some(section.to_string()),
            line,
            column: 1,
            ..Self::default()
        }
    }

    pub fn with_this(mut self, this: ObjectRef) -> Self {
        self.this = Some(this);
        self
    }

    pub fn with_local(mut self, name: &str, type_id: TypeId, address: Address) -> Self {
        self.locals.push(LocalVar {
            name: name.to_string(),
            type_id,
            address,
            in_scope: true,
        });
        self
    }
}

#[derive(Default)]
struct MockState {
    /// Innermost frame first.
    frames: Vec<MockFrame>,
    globals: Vec<GlobalVar>,
    types: HashMap<u32, TypeInfo>,
    memory: HashMap<Address, ScriptValue>,
}

/// Deterministic, in-memory script context test double.
///
/// Values live in a fake address space populated with
/// [`MockScriptContext::write_value`].
#[derive(Default)]
pub struct MockScriptContext {
    state: Mutex<MockState>,
}

impl MockScriptContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Context with a single frame executing `line` of `section`.
    pub fn at(function: &str, section: &str, line: u32) -> Self {
        let context = Self::new();
        context.push_frame(MockFrame::new(function, section, line));
        context
    }

    /// Push a new innermost frame (a call).
    pub fn push_frame(&self, frame: MockFrame) {
        self.state.lock().frames.insert(0, frame);
    }

    /// Pop the innermost frame (a return).
    pub fn pop_frame(&self) -> Option<MockFrame> {
        let mut state = self.state.lock();
        if state.frames.is_empty() {
            None
        } else {
            Some(state.frames.remove(0))
        }
    }

    /// Move the innermost frame to `line`.
    pub fn set_line(&self, line: u32) {
        if let Some(frame) = self.state.lock().frames.first_mut() {
            frame.line = line;
        }
    }

    pub fn set_globals(&self, globals: Vec<GlobalVar>) {
        self.state.lock().globals = globals;
    }

    pub fn add_global(&self, name: &str, type_id: TypeId, address: Address) {
        self.state.lock().globals.push(GlobalVar {
            name: name.to_string(),
            type_id,
            address,
        });
    }

    pub fn insert_type(&self, id: u32, info: TypeInfo) {
        self.state.lock().types.insert(id, info);
    }

    pub fn write_value(&self, address: Address, value: ScriptValue) {
        self.state.lock().memory.insert(address, value);
    }

    fn frame<T>(&self, frame: u32, f: impl FnOnce(&MockFrame) -> T) -> Option<T> {
        let state = self.state.lock();
        state.frames.get(frame as usize).map(f)
    }
}

impl ScriptContext for MockScriptContext {
    fn callstack_size(&self) -> u32 {
        self.state.lock().frames.len() as u32
    }

    fn line_info(&self, frame: u32) -> LineInfo {
        self.frame(frame, |f| LineInfo {
            line: f.line,
            column: f.column,
            section: f.section.clone(),
        })
        .unwrap_or(LineInfo {
            line: 0,
            column: 0,
            section: None,
        })
    }

    fn function_name(&self, frame: u32) -> Option<String> {
        self.frame(frame, |f| f.function.clone()).flatten()
    }

    fn this_object(&self, frame: u32) -> Option<ObjectRef> {
        self.frame(frame, |f| f.this).flatten()
    }

    fn locals(&self, frame: u32) -> Vec<LocalVar> {
        self.frame(frame, |f| f.locals.clone()).unwrap_or_default()
    }

    fn module_globals(&self, frame: u32) -> Vec<GlobalVar> {
        let state = self.state.lock();
        if (frame as usize) < state.frames.len() {
            state.globals.clone()
        } else {
            Vec::new()
        }
    }

    fn type_info(&self, type_id: TypeId) -> Option<TypeInfo> {
        match type_id.kind {
            TypeKind::Object(id) => self.state.lock().types.get(&id).cloned(),
            _ => None,
        }
    }

    fn read_value(&self, _type_id: TypeId, address: Address) -> ScriptValue {
        if address == 0 {
            return ScriptValue::Null;
        }
        self.state
            .lock()
            .memory
            .get(&address)
            .cloned()
            .unwrap_or(ScriptValue::Unknown)
    }
}
