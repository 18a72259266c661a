//! Protocol views of a paused execution point.

use crate::coordinator::ExecutionCoordinator;
use crate::dap::types::{Scope, Source, StackFrame, Variable};
use crate::format::{format_value, type_name};
use crate::object_registry::{ObjectHandle, ObjectRegistry, OBJECT_REFERENCE_BASE};
use crate::runtime::{Address, ObjectRef, ScriptContext, TypeId};

/// Frame scopes are encoded as `frame * SCOPE_REFERENCE_STRIDE + selector`.
pub const SCOPE_REFERENCE_STRIDE: i64 = 1000;
pub const LOCALS_SELECTOR: i64 = 1;
pub const GLOBALS_SELECTOR: i64 = 2;

/// Frames at or past this index have no scope references below
/// `OBJECT_REFERENCE_BASE`, so they get no scopes.
pub const MAX_SCOPE_FRAMES: i64 = OBJECT_REFERENCE_BASE / SCOPE_REFERENCE_STRIDE;

const UNKNOWN_FUNCTION: &str = "unknown";

/// What a `variablesReference` points at.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VariablesTarget {
    Locals(u32),
    Globals(u32),
    Object(ObjectHandle),
    Unknown,
}

impl VariablesTarget {
    pub fn decode(reference: i64) -> Self {
        if reference >= OBJECT_REFERENCE_BASE {
            return ObjectHandle::from_variables_reference(reference)
                .map(VariablesTarget::Object)
                .unwrap_or(VariablesTarget::Unknown);
        }
        if reference <= 0 {
            return VariablesTarget::Unknown;
        }

        let Ok(frame) = u32::try_from(reference / SCOPE_REFERENCE_STRIDE) else {
            return VariablesTarget::Unknown;
        };
        match reference % SCOPE_REFERENCE_STRIDE {
            LOCALS_SELECTOR => VariablesTarget::Locals(frame),
            GLOBALS_SELECTOR => VariablesTarget::Globals(frame),
            _ => VariablesTarget::Unknown,
        }
    }
}

/// `None` when `frame_id` is outside `0..MAX_SCOPE_FRAMES`.
pub fn scope_reference(frame_id: i64, selector: i64) -> Option<i64> {
    if !(0..MAX_SCOPE_FRAMES).contains(&frame_id) {
        return None;
    }
    frame_id
        .checked_mul(SCOPE_REFERENCE_STRIDE)?
        .checked_add(selector)
}

/// The fixed Locals/Globals pair for `frame_id`. Does not touch the runtime.
pub fn scopes(frame_id: i64) -> Vec<Scope> {
    [("Locals", LOCALS_SELECTOR), ("Globals", GLOBALS_SELECTOR)]
        .into_iter()
        .filter_map(|(name, selector)| {
            Some(Scope {
                name: name.to_string(),
                variables_reference: scope_reference(frame_id, selector)?,
                expensive: false,
            })
        })
        .collect()
}

/// Every frame of the paused call stack, innermost first. Empty when running.
pub fn stack_trace(coordinator: &ExecutionCoordinator) -> Vec<StackFrame> {
    coordinator
        .with_paused_point(|point| {
            let context = point.context.as_ref();
            (0..context.callstack_size())
                .map(|frame| stack_frame(context, frame))
                .collect()
        })
        .unwrap_or_default()
}

fn stack_frame(context: &dyn ScriptContext, frame: u32) -> StackFrame {
    let info = context.line_info(frame);
    let path = info.section.unwrap_or_default();
    StackFrame {
        id: i64::from(frame),
        name: context
            .function_name(frame)
            .unwrap_or_else(|| UNKNOWN_FUNCTION.to_string()),
        line: info.line,
        column: info.column,
        source: Source {
            name: basename(&path).to_string(),
            path,
        },
    }
}

fn basename(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

/// Resolve `reference` against the paused execution point.
///
/// Frame scopes list the frame's bound receiver first as a synthetic `this`
/// whose properties can be expanded through `objects`.
pub fn variables(
    coordinator: &ExecutionCoordinator,
    objects: &mut ObjectRegistry,
    reference: i64,
) -> Vec<Variable> {
    coordinator
        .with_paused_point(|point| {
            let context = &point.context;
            match VariablesTarget::decode(reference) {
                VariablesTarget::Locals(frame) if frame < context.callstack_size() => {
                    let mut vars: Vec<Variable> =
                        this_variable(context.as_ref(), objects, frame).into_iter().collect();
                    vars.extend(locals(context.as_ref(), frame));
                    vars
                }
                VariablesTarget::Globals(frame) if frame < context.callstack_size() => {
                    let mut vars: Vec<Variable> =
                        this_variable(context.as_ref(), objects, frame).into_iter().collect();
                    vars.extend(globals(context.as_ref(), frame));
                    vars
                }
                VariablesTarget::Object(handle) => objects
                    .get(handle)
                    .map(|object| properties(context.as_ref(), object))
                    .unwrap_or_default(),
                _ => Vec::new(),
            }
        })
        .unwrap_or_default()
}

fn this_variable(
    context: &dyn ScriptContext,
    objects: &mut ObjectRegistry,
    frame: u32,
) -> Option<Variable> {
    let object = context.this_object(frame)?;
    if object.address == 0 {
        return None;
    }
    let value = context
        .type_info(object.type_id)
        .map(|info| info.name)
        .unwrap_or_else(|| "object".to_string());
    let handle = objects.track(object);
    Some(Variable {
        name: "this".to_string(),
        value,
        type_: type_name(context, object.type_id),
        variables_reference: handle.as_variables_reference(),
    })
}

fn locals(context: &dyn ScriptContext, frame: u32) -> Vec<Variable> {
    context
        .locals(frame)
        .into_iter()
        .filter(|var| !var.name.is_empty() && var.in_scope)
        .map(|var| leaf(context, var.name, var.type_id, var.address))
        .collect()
}

fn globals(context: &dyn ScriptContext, frame: u32) -> Vec<Variable> {
    context
        .module_globals(frame)
        .into_iter()
        .map(|var| leaf(context, var.name, var.type_id, var.address))
        .collect()
}

fn properties(context: &dyn ScriptContext, object: ObjectRef) -> Vec<Variable> {
    let Some(info) = context.type_info(object.type_id) else {
        return Vec::new();
    };
    info.properties
        .into_iter()
        .map(|prop| {
            let address = object.address.wrapping_add(prop.offset);
            leaf(context, prop.name, prop.type_id, address)
        })
        .collect()
}

fn leaf(
    context: &dyn ScriptContext,
    name: String,
    type_id: TypeId,
    address: Address,
) -> Variable {
    Variable {
        name,
        value: format_value(context, type_id, address),
        type_: type_name(context, type_id),
        variables_reference: 0,
    }
}
