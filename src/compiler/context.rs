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

//! Lowering context and core state management.

use super::*;

/// Marker for a construct whose diagnostic has already been recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct Reported;

/// Result of lowering one construct.
pub(super) type Lowered<T> = Result<T, Reported>;

/// A name visible in the procedure being lowered.
#[derive(Debug, Clone)]
pub(super) struct Binding {
    pub(super) slot: usize,
    pub(super) ty: DataType,
    pub(super) is_const: bool,
    // Set when the declaration itself failed; uses stay silent.
    pub(super) poisoned: bool,
}

/// Declared shape of one method, known before any body is lowered.
#[derive(Debug, Clone)]
pub(super) struct MethodSig {
    pub(super) name: String,
    pub(super) signature: Signature,
}

/// Declared shape of one class.
#[derive(Debug, Clone)]
pub(super) struct ClassSig {
    pub(super) name: String,
    pub(super) is_abstract: bool,
    pub(super) methods: Vec<MethodSig>,
}

/// One helper call, recorded for recursion detection.
#[derive(Debug, Clone)]
pub(super) struct CallEdge {
    pub(super) caller: (usize, usize),
    pub(super) callee: (usize, usize),
    pub(super) span: SourceSpan,
}

/// Lowering context for one compilation unit.
///
/// Holds the class table, the scope stack and frame layout of the procedure
/// being lowered, and every diagnostic found so far.
pub(super) struct LowerContext<'s> {
    pub(super) source: &'s str,
    pub(super) diagnostics: Vec<Diagnostic>,
    pub(super) classes: Vec<ClassSig>,
    pub(super) calls: Vec<CallEdge>,
    pub(super) current: (usize, usize),
    pub(super) current_name: String,
    pub(super) return_type: Option<DataType>,
    pub(super) scopes: Vec<HashMap<String, Binding>>,
    pub(super) slots: Vec<DataType>,
    pub(super) sites: Vec<FaultLocation>,
}

impl<'s> LowerContext<'s> {
    /// Creates a fresh lowering context bound to source text.
    pub(super) fn new(source: &'s str) -> Self {
        Self {
            source,
            diagnostics: Vec::new(),
            classes: Vec::new(),
            calls: Vec::new(),
            current: (0, 0),
            current_name: String::new(),
            return_type: None,
            scopes: Vec::new(),
            slots: Vec::new(),
            sites: Vec::new(),
        }
    }

    /// Records a source-mapped diagnostic.
    pub(super) fn error_at(&mut self, message: impl Into<String>, span: &SourceSpan) -> Reported {
        self.diagnostics
            .push(Diagnostic::from_span(message, self.source, span));
        Reported
    }

    /// Records a diagnostic with no source location.
    pub(super) fn error(&mut self, message: impl Into<String>) -> Reported {
        self.diagnostics.push(Diagnostic::message_only(message));
        Reported
    }

    /// Resets per-procedure state before lowering a method body.
    pub(super) fn begin_procedure(
        &mut self,
        current: (usize, usize),
        name: &str,
        return_type: Option<DataType>,
    ) {
        self.current = current;
        self.current_name = name.to_string();
        self.return_type = return_type;
        self.scopes = vec![HashMap::new()];
        self.slots.clear();
        self.sites.clear();
    }

    /// Hands back the frame layout and fault sites of the finished procedure.
    pub(super) fn end_procedure(&mut self) -> (Vec<DataType>, Vec<FaultLocation>) {
        self.scopes.clear();
        (
            std::mem::take(&mut self.slots),
            std::mem::take(&mut self.sites),
        )
    }

    /// Registers a fault site for a statement and returns its index.
    pub(super) fn site(&mut self, span: &SourceSpan) -> usize {
        self.sites
            .push(FaultLocation::new(&self.current_name, self.source, span));
        self.sites.len() - 1
    }

    pub(super) fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    pub(super) fn pop_scope(&mut self) {
        let _ = self.scopes.pop();
    }

    /// Declares a name in the innermost scope and allocates its slot.
    pub(super) fn declare(
        &mut self,
        name: &str,
        ty: DataType,
        is_const: bool,
        span: &SourceSpan,
    ) -> Lowered<usize> {
        let duplicate = self
            .scopes
            .last()
            .is_some_and(|scope| scope.contains_key(name));
        if duplicate {
            return Err(self.error_at(
                format!("A local variable or parameter named '{name}' is already defined in this scope"),
                span,
            ));
        }
        let slot = self.slots.len();
        self.slots.push(ty);
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(
                name.to_string(),
                Binding {
                    slot,
                    ty,
                    is_const,
                    poisoned: false,
                },
            );
        }
        Ok(slot)
    }

    /// Allocates the slot of a parameter. Parameters take the leading slots in
    /// declaration order; duplicates were reported with the signature.
    pub(super) fn declare_parameter(&mut self, name: &str, ty: DataType) {
        let slot = self.slots.len();
        self.slots.push(ty);
        if let Some(scope) = self.scopes.last_mut() {
            scope.entry(name.to_string()).or_insert(Binding {
                slot,
                ty,
                is_const: false,
                poisoned: false,
            });
        }
    }

    /// Declares a name whose declaration failed so later uses stay silent.
    pub(super) fn declare_poisoned(&mut self, name: &str) {
        let slot = self.slots.len();
        self.slots.push(DataType::Double);
        if let Some(scope) = self.scopes.last_mut() {
            scope.entry(name.to_string()).or_insert(Binding {
                slot,
                ty: DataType::Double,
                is_const: false,
                poisoned: true,
            });
        }
    }

    /// Looks a name up from the innermost scope outward.
    pub(super) fn resolve_binding(&self, name: &str) -> Option<Binding> {
        for scope in self.scopes.iter().rev() {
            if let Some(binding) = scope.get(name) {
                return Some(binding.clone());
            }
        }
        None
    }

    /// Applies the implicit conversions of assignment (`int` to `double`).
    pub(super) fn coerce(
        &mut self,
        value: IrExpr,
        target: DataType,
        span: &SourceSpan,
    ) -> Lowered<IrExpr> {
        if value.ty == target {
            return Ok(value);
        }
        if value.ty == DataType::Int && target == DataType::Double {
            return Ok(value.convert(Conversion::IntToDouble, DataType::Double));
        }
        Err(self.error_at(
            format!(
                "Cannot implicitly convert type '{}' to '{}'",
                value.ty, target
            ),
            span,
        ))
    }
}
