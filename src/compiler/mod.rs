/*
MIT License

Copyright (c) 2026 Raja Lehtihet and Wael El Oraiby

Permission is hereby granted, free of charge, to any person obtaining a copy
of this software and associated documentation files (the "Software"), to deal
in the Software without restriction, including without limitation the rights
to use, copy, modify, merge, publish, distribute, sublicense, and/or sell
copies of the Software, and to permit persons to whom the Software is
furnished to do so, subject to the following conditions:

The above copyright notice and this permission notice shall be included in all
copies or substantial portions of the Software.

THE SOFTWARE IS PROVIDED "AS IS", WITHOUT WARRANTY OF ANY KIND, EXPRESS OR
IMPLIED, INCLUDING BUT NOT LIMITED TO THE WARRANTIES OF MERCHANTABILITY,
FITNESS FOR A PARTICULAR PURPOSE AND NONINFRINGEMENT. IN NO EVENT SHALL THE
AUTHORS OR COPYRIGHT HOLDERS BE LIABLE FOR ANY CLAIM, DAMAGES OR OTHER
LIABILITY, WHETHER IN AN ACTION OF CONTRACT, TORT OR OTHERWISE, ARISING FROM,
OUT OF OR IN CONNECTION WITH THE SOFTWARE OR THE USE OR OTHER DEALINGS IN THE
SOFTWARE.
*/

//! Formula lowering from parsed AST into the slot-based IR.
//!
//! Lowering runs in passes: wrap the source into classes, declare every class
//! and method signature, lower each body with type checking, then reject
//! recursive call cycles and unsupported entry signatures. Diagnostics are
//! collected across all passes and reported together.

mod builtins;
mod calls;
mod context;
mod decls;
mod expr;
mod wrap;

use crate::ast::{
    AssignOp, BinOp, ClassDef, Decl, Expr, ExprKind, Method, ParamMode, Program, SourceSpan, Stmt, StmtKind,
    TypeName, UnaryOp,
};
use crate::diagnostics::{CompileError, Diagnostic};
use crate::unit::ir::{
    ArithOp, CompareOp, Conversion, IrExpr, IrExprKind, IrStmt, IrStmtKind, Scalar,
};
use crate::unit::{
    ClassUnit, DataType, ENTRY_POINT, ExecutableUnit, FaultLocation, ParamKind, Parameter,
    Procedure, Signature,
};
use std::collections::{HashMap, HashSet};
use tracing::debug;

use self::context::{CallEdge, ClassSig, Lowered, LowerContext, MethodSig, Reported};

/// Lowers a parsed program into an executable unit.
pub(crate) fn lower_program(
    label: &str,
    source: &str,
    program: &Program,
) -> Result<ExecutableUnit, CompileError> {
    let mut ctx = LowerContext::new(source);

    let Ok((form, classes)) = ctx.wrap_program(program) else {
        return Err(CompileError::from_diagnostics(label, ctx.diagnostics));
    };
    ctx.declare_classes(&classes);

    let mut units = Vec::with_capacity(classes.len());
    for (class_idx, class) in classes.iter().enumerate() {
        let mut procedures = Vec::with_capacity(class.methods.len());
        for (method_idx, method) in class.methods.iter().enumerate() {
            procedures.push(ctx.lower_method((class_idx, method_idx), method));
        }
        units.push(ClassUnit {
            name: class.name.clone(),
            is_abstract: class.is_abstract,
            procedures,
        });
    }

    ctx.check_recursion();
    ctx.check_entry_signature(&classes);

    if !ctx.diagnostics.is_empty() {
        debug!(
            label,
            diagnostics = ctx.diagnostics.len(),
            "formula compilation failed"
        );
        return Err(CompileError::from_diagnostics(label, ctx.diagnostics));
    }

    let unit = ExecutableUnit::new(source, form, units);
    debug!(
        label,
        unit = %unit.id(),
        assembly = unit.assembly_name(),
        ?form,
        "formula compiled"
    );
    Ok(unit)
}

/// Maps a declared type keyword to its static type.
pub(super) fn data_type(ty: TypeName) -> DataType {
    match ty {
        TypeName::Double => DataType::Double,
        TypeName::Int => DataType::Int,
        TypeName::String => DataType::Text,
        TypeName::Bool => DataType::Bool,
    }
}

impl LowerContext<'_> {
    /// Builds the class table and reports duplicate classes, methods and
    /// parameters.
    fn declare_classes(&mut self, classes: &[ClassDef]) {
        let mut class_names = HashSet::new();
        for class in classes {
            if !class_names.insert(class.name.as_str()) {
                self.error_at(
                    format!("The namespace already contains a definition for '{}'", class.name),
                    &class.span,
                );
            }

            let mut method_names = HashSet::new();
            let mut methods = Vec::with_capacity(class.methods.len());
            for method in &class.methods {
                if !method_names.insert(method.name.as_str()) {
                    self.error_at(
                        format!(
                            "Type '{}' already defines a member called '{}'",
                            class.name, method.name
                        ),
                        &method.span,
                    );
                }
                methods.push(MethodSig {
                    name: method.name.clone(),
                    signature: self.method_signature(method),
                });
            }

            self.classes.push(ClassSig {
                name: class.name.clone(),
                is_abstract: class.is_abstract,
                methods,
            });
        }
    }

    fn method_signature(&mut self, method: &Method) -> Signature {
        let mut seen = HashSet::new();
        let mut params = Vec::with_capacity(method.params.len());
        for param in &method.params {
            if !seen.insert(param.name.as_str()) {
                self.error_at(
                    format!("The parameter name '{}' is a duplicate", param.name),
                    &param.span,
                );
            }
            params.push(Parameter {
                name: param.name.clone(),
                ty: data_type(param.ty),
                kind: match param.mode {
                    ParamMode::In => ParamKind::Input,
                    ParamMode::Out => ParamKind::Output,
                },
            });
        }
        Signature {
            params,
            return_type: method.return_ty.map(data_type),
        }
    }

    /// Lowers one method body into a procedure.
    fn lower_method(&mut self, index: (usize, usize), method: &Method) -> Procedure {
        let signature = self
            .classes
            .get(index.0)
            .and_then(|c| c.methods.get(index.1))
            .map(|m| m.signature.clone())
            .unwrap_or_default();

        self.begin_procedure(index, &method.name, signature.return_type);
        for param in &signature.params {
            self.declare_parameter(&param.name, param.ty);
        }

        let mut body = Vec::new();
        for stmt in &method.body {
            self.lower_stmt(stmt, &mut body);
        }

        if signature.return_type.is_some() && !decls::always_exits(&method.body) {
            self.error_at(
                format!("'{}': not all code paths return a value", method.name),
                &method.span,
            );
        }

        let (slots, sites) = self.end_procedure();
        Procedure {
            name: method.name.clone(),
            signature,
            slots,
            body,
            sites,
        }
    }

    /// Rejects entry procedures whose parameters or return type cannot be
    /// exchanged with card variables.
    fn check_entry_signature(&mut self, classes: &[ClassDef]) {
        let Some(class) = classes.iter().find(|c| !c.is_abstract) else {
            return;
        };
        let Some(method) = class.methods.iter().find(|m| m.name == ENTRY_POINT) else {
            return;
        };
        for param in &method.params {
            if param.ty == TypeName::Bool {
                self.error_at(
                    format!(
                        "Entry procedure '{ENTRY_POINT}' parameter '{}' has unsupported type 'bool'; use double, int or string",
                        param.name
                    ),
                    &param.span,
                );
            }
        }
        if method.return_ty == Some(TypeName::Bool) {
            self.error_at(
                format!(
                    "Entry procedure '{ENTRY_POINT}' has unsupported return type 'bool'; use double, int, string or void"
                ),
                &method.span,
            );
        }
    }
}
