use serde_json::{Number, Value};

use super::funcs;
use super::parse::{Command, Node, Operand, Pipeline};

/// Walks a parsed template against a JSON value, collecting output.
///
/// Output written before an error stays in the buffer so callers can report
/// what was produced.
pub(crate) struct Exec<'a> {
    root: &'a Value,
    out: String,
}

impl<'a> Exec<'a> {
    pub(crate) fn new(root: &'a Value) -> Self {
        Self {
            root,
            out: String::new(),
        }
    }

    pub(crate) fn into_output(self) -> String {
        self.out
    }

    pub(crate) fn walk(&mut self, nodes: &[Node], dot: &Value) -> Result<(), String> {
        for node in nodes {
            match node {
                Node::Text(text) => self.out.push_str(text),
                Node::Action(pipeline) => {
                    let value = self.eval_pipeline(pipeline, dot)?;
                    print(&value, &mut self.out);
                }
                Node::If {
                    cond,
                    then,
                    otherwise,
                } => {
                    if truthy(&self.eval_pipeline(cond, dot)?) {
                        self.walk(then, dot)?;
                    } else {
                        self.walk(otherwise, dot)?;
                    }
                }
                Node::With {
                    pipe,
                    body,
                    otherwise,
                } => {
                    let value = self.eval_pipeline(pipe, dot)?;
                    if truthy(&value) {
                        self.walk(body, &value)?;
                    } else {
                        self.walk(otherwise, dot)?;
                    }
                }
                Node::Range {
                    pipe,
                    body,
                    otherwise,
                } => {
                    let value = self.eval_pipeline(pipe, dot)?;
                    let items: Vec<&Value> = match &value {
                        Value::Array(items) => items.iter().collect(),
                        Value::Object(map) => map.values().collect(),
                        Value::Null => Vec::new(),
                        other => return Err(format!("range can't iterate over {}", type_name(other))),
                    };
                    if items.is_empty() {
                        self.walk(otherwise, dot)?;
                    }
                    for item in items {
                        self.walk(body, item)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn eval_pipeline(&self, pipeline: &Pipeline, dot: &Value) -> Result<Value, String> {
        let mut piped = None;
        for cmd in &pipeline.cmds {
            piped = Some(self.eval_command(cmd, dot, piped)?);
        }
        Ok(piped.unwrap_or(Value::Null))
    }

    fn eval_command(&self, cmd: &Command, dot: &Value, piped: Option<Value>) -> Result<Value, String> {
        match &cmd.args[0] {
            Operand::Func(name) => {
                let mut args = cmd.args[1..]
                    .iter()
                    .map(|arg| self.eval_operand(arg, dot))
                    .collect::<Result<Vec<_>, _>>()?;
                args.extend(piped);
                funcs::call(name, &args)
            }
            operand => {
                if cmd.args.len() > 1 || piped.is_some() {
                    return Err("can't give argument to non-function".to_string());
                }
                self.eval_operand(operand, dot)
            }
        }
    }

    fn eval_operand(&self, operand: &Operand, dot: &Value) -> Result<Value, String> {
        match operand {
            Operand::Dot => Ok(dot.clone()),
            Operand::Field(path) => field(dot, path),
            Operand::Root(path) => field(self.root, path),
            Operand::Str(text) => Ok(Value::String(text.clone())),
            Operand::Int(n) => Ok(Value::from(*n)),
            Operand::Float(f) => Number::from_f64(*f)
                .map(Value::Number)
                .ok_or_else(|| format!("invalid number {}", f)),
            Operand::Bool(b) => Ok(Value::Bool(*b)),
            Operand::Nil => Ok(Value::Null),
            Operand::Func(name) => funcs::call(name, &[]),
            Operand::Sub(pipeline, path) => {
                let value = self.eval_pipeline(pipeline, dot)?;
                field(&value, path)
            }
        }
    }
}

fn field(value: &Value, path: &[String]) -> Result<Value, String> {
    let mut current = value;
    for name in path {
        current = match current {
            Value::Object(map) => map
                .get(name)
                .ok_or_else(|| format!("can't evaluate field {}", name))?,
            Value::Null => return Err(format!("nil pointer evaluating .{}", name)),
            other => {
                return Err(format!(
                    "can't evaluate field {} in type {}",
                    name,
                    type_name(other)
                ))
            }
        };
    }
    Ok(current.clone())
}

pub(crate) fn truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "nil",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "map",
    }
}

pub(crate) fn print(value: &Value, out: &mut String) {
    match value {
        Value::Null => out.push_str("<nil>"),
        Value::Bool(b) => out.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => out.push_str(&n.to_string()),
        Value::String(s) => out.push_str(s),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                print(item, out);
            }
            out.push(']');
        }
        Value::Object(map) => {
            out.push_str("map[");
            for (i, (key, item)) in map.iter().enumerate() {
                if i > 0 {
                    out.push(' ');
                }
                out.push_str(key);
                out.push(':');
                print(item, out);
            }
            out.push(']');
        }
    }
}
