use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context};
use itertools::Itertools;
use oxc::{
  allocator::Allocator,
  ast::ast::{
    AssignmentTarget, BindingPatternKind, CallExpression, Expression, ObjectPropertyKind,
    PropertyKind, Statement,
  },
  parser::Parser,
  span::{GetSpan, SourceType},
  syntax::operator::AssignmentOperator,
};
use rustc_hash::FxHashMap;
use serde_json::{Map, Number, Value};
use sugar_path::SugarPath;

const MAX_BINDING_DEPTH: usize = 16;

/// Statically evaluates the value a config module exports through `module.exports = ...` or
/// `export default ...` into JSON.
///
/// Only literal data is accepted, plus references to top-level constants, `__dirname` and
/// `path.resolve` / `path.join` calls with literal arguments. Regular expression literals become
/// their pattern source.
pub fn eval_js_config(
  source: &str,
  source_type: SourceType,
  dirname: &Path,
) -> anyhow::Result<Value> {
  let allocator = Allocator::default();
  let ret = Parser::new(&allocator, source, source_type).parse();
  if !ret.errors.is_empty() {
    bail!("{}", ret.errors.iter().map(ToString::to_string).join("\n"));
  }

  let mut bindings = FxHashMap::default();
  let mut exported = None;
  for stmt in ret.program.body.iter() {
    match stmt {
      Statement::VariableDeclaration(decl) => {
        for declarator in decl.declarations.iter() {
          if let (BindingPatternKind::BindingIdentifier(ident), Some(init)) =
            (&declarator.id.kind, &declarator.init)
          {
            bindings.insert(ident.name.as_str(), init);
          }
        }
      }
      Statement::ExpressionStatement(expr_stmt) => match &expr_stmt.expression {
        Expression::AssignmentExpression(assign)
          if assign.operator == AssignmentOperator::Assign && is_module_exports(&assign.left) =>
        {
          exported = Some(&assign.right);
        }
        _ => return Err(unsupported_statement(source, stmt)),
      },
      Statement::ExportDefaultDeclaration(decl) => match decl.declaration.as_expression() {
        Some(expr) => exported = Some(expr),
        None => return Err(unsupported_statement(source, stmt)),
      },
      // Type-only and import statements cannot change the exported value.
      Statement::ImportDeclaration(_)
      | Statement::EmptyStatement(_)
      | Statement::TSTypeAliasDeclaration(_)
      | Statement::TSInterfaceDeclaration(_) => {}
      _ => return Err(unsupported_statement(source, stmt)),
    }
  }

  let exported = exported.context(
    "The config module exports nothing, expected `module.exports = { ... }` or `export default { ... }`",
  )?;

  Evaluator { source, dirname, bindings }.eval(exported, "", 0)
}

struct Evaluator<'a, 'b> {
  source: &'b str,
  dirname: &'b Path,
  bindings: FxHashMap<&'b str, &'b Expression<'a>>,
}

impl<'a> Evaluator<'a, '_> {
  fn eval(&self, expr: &Expression<'a>, path: &str, depth: usize) -> anyhow::Result<Value> {
    let value = match expr {
      Expression::StringLiteral(lit) => Value::String(lit.value.to_string()),
      Expression::TemplateLiteral(lit) if lit.expressions.is_empty() => Value::String(
        lit
          .quasis
          .iter()
          .map(|quasi| quasi.value.cooked.as_ref().unwrap_or(&quasi.value.raw).as_str())
          .collect(),
      ),
      Expression::NumericLiteral(lit) => Number::from_f64(lit.value)
        .map(Value::Number)
        .with_context(|| format!("`{}` is not a finite number", display_path(path)))?,
      Expression::BooleanLiteral(lit) => Value::Bool(lit.value),
      Expression::NullLiteral(_) => Value::Null,
      Expression::RegExpLiteral(lit) => {
        Value::String(regex_literal_to_pattern(lit.span.source_text(self.source)))
      }
      Expression::ParenthesizedExpression(expr) => self.eval(&expr.expression, path, depth)?,
      Expression::TSAsExpression(expr) => self.eval(&expr.expression, path, depth)?,
      Expression::TSSatisfiesExpression(expr) => self.eval(&expr.expression, path, depth)?,
      Expression::ArrayExpression(array) => Value::Array(
        array
          .elements
          .iter()
          .enumerate()
          .map(|(idx, element)| {
            let path = format!("{path}[{idx}]");
            let expr = element
              .as_expression()
              .with_context(|| format!("Unsupported array element at `{path}`"))?;
            self.eval(expr, &path, depth)
          })
          .collect::<anyhow::Result<_>>()?,
      ),
      Expression::ObjectExpression(object) => {
        let mut map = Map::new();
        for property in object.properties.iter() {
          let ObjectPropertyKind::ObjectProperty(property) = property else {
            bail!("Spread properties are not supported in `{}`", display_path(path));
          };
          let key = property
            .key
            .static_name()
            .with_context(|| format!("Computed keys are not supported in `{}`", display_path(path)))?;
          let path = if path.is_empty() { key.to_string() } else { format!("{path}.{key}") };
          if property.method || !matches!(property.kind, PropertyKind::Init) {
            bail!("`{path}` must be a plain value, not a method or accessor");
          }
          let value = self.eval(&property.value, &path, depth)?;
          map.insert(key.into_owned(), value);
        }
        Value::Object(map)
      }
      Expression::Identifier(ident) => match ident.name.as_str() {
        "__dirname" => Value::String(self.dirname.to_string_lossy().into_owned()),
        "undefined" => Value::Null,
        name => {
          let init = self.bindings.get(name).with_context(|| {
            format!(
              "`{}` refers to `{name}`, which is not a top-level constant of the config module",
              display_path(path)
            )
          })?;
          if depth >= MAX_BINDING_DEPTH {
            bail!("`{name}` is nested too deeply to be evaluated");
          }
          self.eval(init, path, depth + 1)?
        }
      },
      Expression::CallExpression(call) => self.eval_path_call(call, path, depth)?,
      _ => bail!(
        "Unsupported expression at `{}`: only literal values can be evaluated",
        display_path(path)
      ),
    };
    Ok(value)
  }

  fn eval_path_call(
    &self,
    call: &CallExpression<'a>,
    path: &str,
    depth: usize,
  ) -> anyhow::Result<Value> {
    let method = match &call.callee {
      Expression::StaticMemberExpression(member)
        if matches!(&member.object, Expression::Identifier(ident) if ident.name.as_str() == "path") =>
      {
        member.property.name.as_str()
      }
      _ => bail!(
        "Unsupported call at `{}`: only `path.resolve(...)` and `path.join(...)` can be evaluated",
        display_path(path)
      ),
    };

    let segments = call
      .arguments
      .iter()
      .enumerate()
      .map(|(idx, argument)| {
        let expr = argument
          .as_expression()
          .with_context(|| format!("Spread arguments are not supported in `{}`", display_path(path)))?;
        match self.eval(expr, path, depth)? {
          Value::String(segment) => Ok(segment),
          _ => bail!("Argument {idx} of `path.{method}` at `{}` must be a string", display_path(path)),
        }
      })
      .collect::<anyhow::Result<Vec<_>>>()?;

    let joined = match method {
      // Absolute segments restart the path, relative ones are taken from the config's directory.
      "resolve" => {
        segments.iter().fold(self.dirname.to_path_buf(), |acc, segment| acc.join(segment))
      }
      "join" => PathBuf::from(segments.iter().filter(|segment| !segment.is_empty()).join("/")),
      _ => bail!("Unsupported call `path.{method}` at `{}`", display_path(path)),
    };

    Ok(Value::String(joined.normalize().to_string_lossy().into_owned()))
  }
}

/// Anything besides declarations and the export could mutate the config after the fact, e.g.
/// `config.devtool = 'eval'`, so it is rejected rather than ignored.
fn unsupported_statement(source: &str, stmt: &Statement) -> anyhow::Error {
  let span = stmt.span();
  let line = source[..span.start as usize].matches('\n').count() + 1;
  let text = span.source_text(source).lines().next().unwrap_or_default();
  anyhow!(
    "Unsupported statement `{text}` at line {line}: a config module may only declare constants \
     and assign `module.exports`"
  )
}

fn is_module_exports(target: &AssignmentTarget) -> bool {
  matches!(
    target,
    AssignmentTarget::StaticMemberExpression(member)
      if member.property.name.as_str() == "exports"
        && matches!(&member.object, Expression::Identifier(ident) if ident.name.as_str() == "module")
  )
}

fn display_path(path: &str) -> &str {
  if path.is_empty() {
    "<root>"
  } else {
    path
  }
}

/// `/\.ts$/i` becomes `(?i)\.ts$`. Only the `i`, `m` and `s` flags change what a pattern matches.
fn regex_literal_to_pattern(literal: &str) -> String {
  let Some(end) = literal.rfind('/').filter(|end| *end > 0) else {
    return literal.to_string();
  };
  let (body, flags) = (&literal[1..end], &literal[end + 1..]);

  let mut pattern = String::with_capacity(body.len() + 6);
  let inline_flags: String = flags.chars().filter(|flag| matches!(flag, 'i' | 'm' | 's')).collect();
  if !inline_flags.is_empty() {
    pattern.push_str("(?");
    pattern.push_str(&inline_flags);
    pattern.push(')');
  }

  let mut chars = body.chars();
  while let Some(ch) = chars.next() {
    if ch == '\\' {
      if let Some(next) = chars.next() {
        // `\/` is only needed inside a JS literal.
        if next != '/' {
          pattern.push('\\');
        }
        pattern.push(next);
      }
    } else {
      pattern.push(ch);
    }
  }
  pattern
}

#[cfg(test)]
fn eval(source: &str, filename: &str) -> anyhow::Result<Value> {
  let source_type = SourceType::from_path(Path::new(filename)).unwrap();
  eval_js_config(source, source_type, Path::new("/project"))
}

#[test]
fn test_eval_commonjs_config() {
  let value = eval(
    r"module.exports = {
  entry: './src/main.ts',
  output: {
    filename: 'dist/bundle.js'
  },
  resolve: {
    extensions: ['.webpack.js', '.web.js', '.ts', '.js']
  },
  module: {
    loaders: [
      { test: /\.ts$/, loader: 'ts-loader' }
    ]
  },
  devtool: 'source-map'
}",
    "webpack.config.js",
  )
  .unwrap();

  assert_eq!(
    value,
    serde_json::json!({
      "entry": "./src/main.ts",
      "output": { "filename": "dist/bundle.js" },
      "resolve": { "extensions": [".webpack.js", ".web.js", ".ts", ".js"] },
      "module": { "loaders": [{ "test": "\\.ts$", "loader": "ts-loader" }] },
      "devtool": "source-map"
    })
  );
}

#[test]
fn test_eval_bindings_and_path_calls() {
  let value = eval(
    r"const path = require('path');
const extensions = ['', '.js'];
const config = {
  context: __dirname,
  entry: `./src/index.js`,
  output: { path: path.resolve(__dirname, 'dist'), filename: path.join('js', 'bundle.js') },
  resolve: { extensions },
  devtool: false,
};
module.exports = config;",
    "webpack.config.js",
  )
  .unwrap();

  assert_eq!(value["context"], "/project");
  assert_eq!(value["entry"], "./src/index.js");
  assert_eq!(value["output"]["path"], "/project/dist");
  assert_eq!(value["output"]["filename"], "js/bundle.js");
  assert_eq!(value["resolve"]["extensions"], serde_json::json!(["", ".js"]));
  assert_eq!(value["devtool"], false);
}

#[test]
fn test_eval_esm_typescript_config() {
  let value = eval(
    r"export default ({ entry: './main.ts', module: { loaders: [{ test: /\.TSX?$/i, loader: 'ts' }] } }) satisfies object;",
    "webpack.config.ts",
  )
  .unwrap();
  assert_eq!(value["module"]["loaders"][0]["test"], "(?i)\\.TSX?$");
}

#[test]
fn test_eval_rejects_dynamic_values() {
  let err = eval("module.exports = { entry: getEntry() };", "webpack.config.js").unwrap_err();
  assert!(err.to_string().contains("`entry`"), "{err}");

  let err = eval("module.exports = { module: { loaders: [{ test: re }] } };", "webpack.config.js")
    .unwrap_err();
  assert!(err.to_string().contains("`module.loaders[0].test` refers to `re`"), "{err}");

  let err = eval("const base = {}; module.exports = { ...base };", "webpack.config.js").unwrap_err();
  assert!(err.to_string().contains("Spread"), "{err}");

  let err = eval("const a = b; const b = a; module.exports = a;", "webpack.config.js").unwrap_err();
  assert!(err.to_string().contains("nested too deeply"), "{err}");
}

#[test]
fn test_eval_rejects_statements_that_mutate_the_config() {
  let err = eval(
    "const config = { entry: './main.js', devtool: 'eval' };\nconfig.devtool = 'source-map';\nmodule.exports = config;",
    "webpack.config.js",
  )
  .unwrap_err();
  assert!(err.to_string().starts_with("Unsupported statement `config.devtool = 'source-map';` at line 2"), "{err}");

  for source in [
    "module.exports = { entry: './a.js' };\nmodule.exports.entry = './b.js';",
    "exports.entry = './a.js';",
    "module.exports = {};\nif (process.env.CI) { module.exports.devtool = 'eval'; }",
    "module.exports = {};\nmodule.exports += '';",
    "require('dotenv').config();\nmodule.exports = {};",
  ] {
    let err = eval(source, "webpack.config.js").unwrap_err();
    assert!(err.to_string().starts_with("Unsupported statement"), "{source}: {err}");
  }
}

#[test]
fn test_eval_allows_imports_and_types() {
  let value = eval(
    "import path from 'path';\ntype Config = { entry: string };\n;\nexport default { entry: './main.ts' };",
    "webpack.config.ts",
  )
  .unwrap();
  assert_eq!(value["entry"], "./main.ts");
}

#[test]
fn test_eval_requires_export() {
  let err = eval("const config = {};", "webpack.config.js").unwrap_err();
  assert!(err.to_string().contains("exports nothing"));
  assert!(eval("module.exports = {", "webpack.config.js").is_err());
}

#[test]
fn test_regex_literal_to_pattern() {
  assert_eq!(regex_literal_to_pattern(r"/\.ts$/"), r"\.ts$");
  assert_eq!(regex_literal_to_pattern(r"/node_modules\//"), "node_modules/");
  assert_eq!(regex_literal_to_pattern(r"/a\\\/b/gm"), r"(?m)a\\/b");
  assert_eq!(regex_literal_to_pattern(r"/[/]x/is"), "(?is)[/]x");
}
