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

//! Lowering for helper method calls and recursion detection.

use super::*;

impl LowerContext<'_> {
    /// Lowers a call to a method of the current class (`Helper(x)`) or of
    /// another class (`Other.Helper(x)`).
    ///
    /// Returns the call together with the callee's declared return type. When
    /// `as_value` is set the callee must return a value.
    pub(super) fn lower_helper_call(
        &mut self,
        name: &str,
        args: &[Expr],
        span: &SourceSpan,
        as_value: bool,
    ) -> Lowered<(IrExpr, Option<DataType>)> {
        let Some((callee, signature)) = self.resolve_method(name) else {
            return Err(self.error_at(
                format!("The name '{name}' does not exist in the current context"),
                span,
            ));
        };

        if signature.outputs().next().is_some() {
            return Err(self.error_at(
                format!("Method '{name}' has out parameters and cannot be called from a formula"),
                span,
            ));
        }
        if args.len() != signature.params.len() {
            return Err(self.error_at(
                format!(
                    "No overload for method '{name}' takes {} arguments",
                    args.len()
                ),
                span,
            ));
        }
        if as_value && signature.return_type.is_none() {
            return Err(self.error_at(
                format!("Method '{name}' returns void and cannot be used as a value"),
                span,
            ));
        }

        let mut lowered = Vec::with_capacity(args.len());
        let mut failed = false;
        for (arg, param) in args.iter().zip(&signature.params) {
            let ir = self
                .lower_expr(arg)
                .and_then(|ir| self.coerce(ir, param.ty, &arg.span));
            match ir {
                Ok(ir) => lowered.push(ir),
                Err(Reported) => failed = true,
            }
        }

        self.calls.push(CallEdge {
            caller: self.current,
            callee,
            span: span.clone(),
        });
        if failed {
            return Err(Reported);
        }

        let ty = signature.return_type.unwrap_or(DataType::Double);
        let call = IrExpr::new(
            IrExprKind::Call {
                class: callee.0,
                procedure: callee.1,
                args: lowered,
            },
            ty,
        );
        Ok((call, signature.return_type))
    }

    fn resolve_method(&self, name: &str) -> Option<((usize, usize), Signature)> {
        let (class_idx, method_name) = match name.split_once('.') {
            Some((class_name, method_name)) => {
                let idx = self.classes.iter().position(|c| c.name == class_name)?;
                (idx, method_name)
            }
            None => (self.current.0, name),
        };
        let class = self.classes.get(class_idx)?;
        let method_idx = class.methods.iter().position(|m| m.name == method_name)?;
        let signature = class.methods.get(method_idx)?.signature.clone();
        Some(((class_idx, method_idx), signature))
    }

    /// Reports every call that closes a cycle in the call graph.
    pub(super) fn check_recursion(&mut self) {
        let mut graph: HashMap<(usize, usize), Vec<usize>> = HashMap::new();
        for (idx, edge) in self.calls.iter().enumerate() {
            graph.entry(edge.caller).or_default().push(idx);
        }

        #[derive(Clone, Copy, PartialEq)]
        enum Mark {
            Active,
            Done,
        }

        let mut marks: HashMap<(usize, usize), Mark> = HashMap::new();
        let mut back_edges = Vec::new();
        let mut roots: Vec<(usize, usize)> = self.calls.iter().map(|e| e.caller).collect();
        roots.dedup();

        for root in roots {
            if marks.contains_key(&root) {
                continue;
            }
            // Iterative DFS: (node, next outgoing edge position).
            let mut stack = vec![(root, 0usize)];
            marks.insert(root, Mark::Active);
            while let Some((node, cursor)) = stack.last_mut() {
                let node = *node;
                let next = graph.get(&node).and_then(|edges| edges.get(*cursor)).copied();
                *cursor += 1;
                let Some(edge_idx) = next else {
                    marks.insert(node, Mark::Done);
                    stack.pop();
                    continue;
                };
                let Some(callee) = self.calls.get(edge_idx).map(|e| e.callee) else {
                    continue;
                };
                match marks.get(&callee) {
                    Some(Mark::Active) => back_edges.push(edge_idx),
                    Some(Mark::Done) => {}
                    None => {
                        marks.insert(callee, Mark::Active);
                        stack.push((callee, 0));
                    }
                }
            }
        }

        back_edges.sort_unstable();
        for edge_idx in back_edges {
            let Some(edge) = self.calls.get(edge_idx).cloned() else {
                continue;
            };
            let name = self
                .classes
                .get(edge.callee.0)
                .and_then(|c| c.methods.get(edge.callee.1))
                .map(|m| m.name.clone())
                .unwrap_or_default();
            self.error_at(
                format!("Recursive call to '{name}' is not supported"),
                &edge.span,
            );
        }
    }
}
