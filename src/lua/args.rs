//! Argument checking in the style of the Lua auxiliary library
//!
//! Positions are 1-based. String arguments accept numbers through Lua's
//! own coercion, absent optional arguments and `nil` read as `None`, and
//! `check_none` rejects anything past the last expected argument, naming
//! the type it found.

use mlua::{ExternalResult, Function, Integer, Lua, MultiValue, Value};

use glirc_lua_runtime::BindingError;

pub(crate) struct Args<'lua> {
    function: &'static str,
    values: Vec<Value<'lua>>,
}

impl<'lua> Args<'lua> {
    pub(crate) fn new(function: &'static str, values: MultiValue<'lua>) -> Self {
        Self {
            function,
            values: values.into_iter().collect(),
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.values.len()
    }

    fn get(&self, position: usize) -> Option<&Value<'lua>> {
        self.values.get(position - 1)
    }

    fn type_name(&self, position: usize) -> &'static str {
        self.get(position).map_or("no value", Value::type_name)
    }

    fn bad(&self, position: usize, detail: impl AsRef<str>) -> mlua::Error {
        mlua::Error::external(BindingError::bad_argument(position, self.function, detail))
    }

    fn expected(&self, position: usize, what: &str) -> mlua::Error {
        self.bad(position, format!("{} expected, got {}", what, self.type_name(position)))
    }

    pub(crate) fn check_string(&self, lua: &'lua Lua, position: usize) -> mlua::Result<mlua::String<'lua>> {
        let value = self.get(position).cloned().unwrap_or(Value::Nil);
        lua.coerce_string(value)?
            .ok_or_else(|| self.expected(position, "string"))
    }

    pub(crate) fn opt_string(&self, lua: &'lua Lua, position: usize) -> mlua::Result<Option<mlua::String<'lua>>> {
        match self.get(position) {
            None | Some(Value::Nil) => Ok(None),
            Some(_) => self.check_string(lua, position).map(Some),
        }
    }

    pub(crate) fn check_integer(&self, lua: &'lua Lua, position: usize) -> mlua::Result<Integer> {
        let value = self.get(position).cloned().unwrap_or(Value::Nil);
        if let Some(integer) = lua.coerce_integer(value.clone())? {
            return Ok(integer);
        }
        // Numbers with a fractional part are numbers, just not integers
        match lua.coerce_number(value)? {
            Some(_) => Err(self.bad(position, "number has no integer representation")),
            None => Err(self.expected(position, "number")),
        }
    }

    pub(crate) fn check_function(&self, position: usize) -> mlua::Result<Function<'lua>> {
        match self.get(position) {
            Some(Value::Function(function)) => Ok(function.clone()),
            _ => Err(self.expected(position, "function")),
        }
    }

    pub(crate) fn check_none(&self, position: usize) -> mlua::Result<()> {
        if self.values.len() >= position {
            Err(self.expected(position, "no value"))
        } else {
            Ok(())
        }
    }

    pub(crate) fn fail(&self, position: usize, detail: &str) -> mlua::Error {
        self.bad(position, detail)
    }
}

/// Text a script sees for a failed library call
pub(crate) fn error_message(err: &mlua::Error) -> String {
    match err {
        mlua::Error::ExternalError(cause) => cause.to_string(),
        mlua::Error::RuntimeError(message) => message.clone(),
        mlua::Error::CallbackError { cause, .. } => error_message(cause),
        other => other.to_string(),
    }
}

/// Raise boundary errors into Lua with their message unchanged
pub(crate) trait RaiseExt<T> {
    fn raise(self) -> mlua::Result<T>;
}

impl<T> RaiseExt<T> for glirc_lua_runtime::Result<T> {
    #[inline]
    fn raise(self) -> mlua::Result<T> {
        self.into_lua_err()
    }
}
