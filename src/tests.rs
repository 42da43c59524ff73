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

//! Crate unit tests.

use super::*;
use proptest::prelude::*;

fn first_caret_column(pointer: &str) -> Option<usize> {
    pointer.chars().position(|ch| ch == '^').map(|idx| idx + 1)
}

fn assert_parse_error_case(case_name: &str, source: &str, expected_line: usize) {
    let err = parse_formula(source).expect_err("parse should fail");
    let diag = err.primary().expect("parse error carries a diagnostic");
    assert_eq!(
        diag.line, expected_line,
        "{case_name}: unexpected error line"
    );
    assert!(diag.column > 0, "{case_name}: expected non-zero column");
    assert!(
        diag.message.contains("Syntax error"),
        "{case_name}: unexpected message '{}'",
        diag.message
    );

    let expected_snippet = source
        .lines()
        .nth(diag.line.saturating_sub(1))
        .unwrap_or_default();
    assert_eq!(
        diag.snippet, expected_snippet,
        "{case_name}: snippet should match source line"
    );
    assert!(
        diag.pointer.contains('^'),
        "{case_name}: missing caret pointer"
    );
    assert_eq!(
        first_caret_column(&diag.pointer),
        Some(diag.column),
        "{case_name}: caret column mismatch"
    );
}

fn compile_messages(source: &str) -> Vec<String> {
    compile_formula(source)
        .expect_err("compile should fail")
        .messages()
        .into_iter()
        .map(str::to_string)
        .collect()
}

fn run(source: &str, inputs: &ResolvedInputs) -> ExecutionResult {
    compile_formula(source)
        .expect("compile should succeed")
        .execute(inputs)
        .expect("execution should succeed")
}

fn run_fault(source: &str, inputs: &ResolvedInputs) -> RuntimeFault {
    let err = compile_formula(source)
        .expect("compile should succeed")
        .execute(inputs)
        .expect_err("execution should fault");
    match err {
        ExecutionError::Fault(fault) => fault,
        other => panic!("expected runtime fault, got {other:?}"),
    }
}

fn eval(expr: &str) -> f64 {
    let source = format!("r = {expr};");
    run(&source, &ResolvedInputs::new())
        .number("r")
        .expect("r is numeric")
}

#[test]
fn reports_parse_errors_for_exhaustive_invalid_forms() {
    let cases = [
        ("missing semicolon", "x = 1 y = 2;", 1),
        ("unclosed parameter list", "double Calc(double a { return a; }", 1),
        ("unclosed condition", "if (a > 1 { b = 2; }", 1),
        ("unclosed call", "x = Math.Pow(a, 2;", 1),
        ("unclosed group", "x = (a + b;", 1),
        ("missing class name", "class { }", 1),
        ("throw without new", "throw Exception(\"x\");", 1),
        ("error on second line", "double a = 1;\ndouble b = ;", 2),
    ];
    for (name, source, line) in cases {
        assert_parse_error_case(name, source, line);
    }
}

#[test]
fn parse_error_renders_label_and_caret() {
    let err = compile_formula_named("x = (1 + ;", "bolt.cs").expect_err("parse should fail");
    let text = err.to_string();
    assert!(text.starts_with("Compilation failed:"), "{text}");
    assert!(text.contains("bolt.cs"), "{text}");
    assert!(text.contains('^'), "{text}");
}

#[test]
fn supports_line_and_block_comments() {
    let src = "// bolt area\nr = 2 * 3; /* scaled */\n";
    assert_eq!(run(src, &ResolvedInputs::new()).number("r"), Some(6.0));
}

#[test]
fn collects_every_compile_diagnostic_with_location() {
    let src = "\
double Calculate(double a, out double r)
{
    r = b + 1;
    string s = a;
    return r;
}";
    let err = compile_formula(src).expect_err("compile should fail");
    assert_eq!(err.diagnostics.len(), 2, "{err}");

    let first = &err.diagnostics[0];
    assert_eq!(first.line, 3);
    assert_eq!(first.column, 9);
    assert_eq!(first.snippet, "    r = b + 1;");
    assert_eq!(first_caret_column(&first.pointer), Some(first.column));
    assert!(first
        .message
        .contains("The name 'b' does not exist in the current context"));

    let second = &err.diagnostics[1];
    assert_eq!(second.line, 4);
    assert!(second
        .message
        .contains("Cannot implicitly convert type 'double' to 'string'"));
}

#[test]
fn rejects_type_errors_in_expressions() {
    let messages = compile_messages("r = 1 + (2 > 1);");
    assert!(
        messages
            .iter()
            .any(|m| m.contains("Operator '+' cannot be applied to operands of type 'int' and 'bool'")),
        "{messages:?}"
    );

    let messages = compile_messages("if (1) { r = 2; }");
    assert!(
        messages
            .iter()
            .any(|m| m.contains("Cannot implicitly convert type 'int' to 'bool'")),
        "{messages:?}"
    );
}

#[test]
fn rejects_assignment_to_const_and_duplicate_locals() {
    let src = "\
double Calculate(out double r)
{
    const double k = 2;
    k = 3;
    double x = 1;
    double x = 2;
    r = k * x;
    return r;
}";
    let messages = compile_messages(src);
    assert!(
        messages
            .iter()
            .any(|m| m.contains("The left-hand side of an assignment must be a variable")),
        "{messages:?}"
    );
    assert!(
        messages.iter().any(|m| m.contains("'x'")),
        "{messages:?}"
    );
}

#[test]
fn rejects_missing_return_path() {
    let src = "double Calculate(double x) { if (x > 0) { return 1; } }";
    let messages = compile_messages(src);
    assert!(
        messages
            .iter()
            .any(|m| m.contains("'Calculate': not all code paths return a value")),
        "{messages:?}"
    );
}

#[test]
fn accepts_return_on_both_branches() {
    let src = "double Calculate(double x) { if (x > 0) { return 1; } else { return -1; } }";
    let result = run(src, &ResolvedInputs::new().number("x", -3.0));
    assert_eq!(result.number(RETURN_VALUE_KEY), Some(-1.0));
}

#[test]
fn rejects_mixed_source_forms() {
    let messages = compile_messages("double F() { return 1; }\nx = 2;");
    assert!(
        messages
            .iter()
            .any(|m| m.contains("Top-level statements cannot be mixed with method definitions")),
        "{messages:?}"
    );
}

#[test]
fn rejects_empty_source() {
    assert!(compile_formula("   // nothing\n").is_err());
}

#[test]
fn compiles_class_form_as_is() {
    let src = "\
using System;
public class BoltCheck
{
    public double Calculate(double load, out double ratio)
    {
        ratio = load / 100;
        return ratio;
    }
}";
    let unit = compile_formula(src).expect("compile should succeed");
    assert_eq!(unit.form(), SourceForm::Classes);
    assert_eq!(unit.classes()[0].name(), "BoltCheck");
    let result = unit
        .execute(&ResolvedInputs::new().number("load", 25.0))
        .expect("execution should succeed");
    assert_eq!(result.number("ratio"), Some(0.25));
    assert_eq!(result.number(RETURN_VALUE_KEY), Some(0.25));
}

#[test]
fn wraps_method_form_in_implicit_class() {
    let src = "double Calculate(double a, double b) { return a * b; }";
    let unit = compile_formula(src).expect("compile should succeed");
    assert_eq!(unit.form(), SourceForm::Methods);
    assert_eq!(unit.classes()[0].name(), IMPLICIT_CLASS);
    let result = unit
        .execute(&ResolvedInputs::new().number("a", 3.0).number("b", 5.0))
        .expect("execution should succeed");
    assert_eq!(result.number(RETURN_VALUE_KEY), Some(15.0));
    assert!(result.outputs.is_empty());
}

#[test]
fn infers_body_form_signature() {
    let src = "area = width * depth;\nif (area > limit) { flag = 1; }";
    let unit = compile_formula(src).expect("compile should succeed");
    assert_eq!(unit.form(), SourceForm::Body);

    let signature = unit.signature().expect("entry point exists");
    let inputs: Vec<&str> = signature.inputs().map(|p| p.name.as_str()).collect();
    let outputs: Vec<&str> = signature.outputs().map(|p| p.name.as_str()).collect();
    assert_eq!(inputs, ["width", "depth", "limit"]);
    assert_eq!(outputs, ["area", "flag"]);
    assert!(signature.params.iter().all(|p| p.ty == DataType::Double));
    assert_eq!(signature.return_type, None);

    let inputs = ResolvedInputs::new()
        .number("width", 3.0)
        .number("depth", 4.0)
        .number("limit", 10.0);
    let result = unit.execute(&inputs).expect("execution should succeed");
    assert_eq!(result.number("area"), Some(12.0));
    assert_eq!(result.number("flag"), Some(1.0));
    assert!(result.get(RETURN_VALUE_KEY).is_none());
}

#[test]
fn untouched_outputs_keep_type_default() {
    let src = "area = width * depth;\nif (area > limit) { flag = 1; }";
    let inputs = ResolvedInputs::new()
        .number("width", 1.0)
        .number("depth", 1.0)
        .number("limit", 10.0);
    assert_eq!(run(src, &inputs).number("flag"), Some(0.0));
}

#[test]
fn missing_inputs_start_at_default() {
    let result = run("r = a + 1;", &ResolvedInputs::new());
    assert_eq!(result.number("r"), Some(1.0));
}

#[test]
fn reports_missing_executable_class() {
    let src = "abstract class Base { public double Calculate() { return 1; } }";
    let unit = compile_formula(src).expect("compile should succeed");
    assert_eq!(
        unit.execute(&ResolvedInputs::new()),
        Err(ExecutionError::NoExecutableClass)
    );
}

#[test]
fn only_first_concrete_class_is_searched() {
    let src = "\
abstract class Base { public double Calculate() { return 1; } }
class Helpers { public static double Twice(double x) { return x * 2; } }
class Later { public double Calculate() { return 2; } }";
    let unit = compile_formula(src).expect("compile should succeed");
    let err = unit
        .execute(&ResolvedInputs::new())
        .expect_err("entry point should be missing");
    assert_eq!(
        err,
        ExecutionError::EntryPointNotFound {
            class: "Helpers".to_string()
        }
    );
    assert!(err.is_entry_point_error());
    assert_eq!(
        err.to_string(),
        "Calculate method not found in class 'Helpers'"
    );
}

#[test]
fn rejects_bool_entry_parameters() {
    let messages = compile_messages("double Calculate(bool flag) { return 1; }");
    assert!(
        messages
            .iter()
            .any(|m| m.contains("parameter 'flag' has unsupported type 'bool'")),
        "{messages:?}"
    );
}

#[test]
fn bool_locals_are_usable_inside_the_body() {
    let src = "\
double Calculate(double load, out double r)
{
    bool heavy = load > 10 && load < 100;
    r = heavy ? 1 : 0;
    return r;
}";
    let result = run(src, &ResolvedInputs::new().number("load", 50.0));
    assert_eq!(result.number("r"), Some(1.0));
}

#[test]
fn honours_operator_precedence() {
    assert_eq!(eval("2 + 3 * 4 - 10 / 4"), 12.0);
    assert_eq!(eval("(2 + 3) * 4 % 7"), 6.0);
    assert_eq!(eval("1 + 2 > 2 ? 10 : 20"), 10.0);
    assert_eq!(eval("-2 * -3"), 6.0);
    assert_eq!(eval("7 / 2 + 7.0 / 2"), 6.5);
}

#[test]
fn integer_division_truncates_toward_zero() {
    assert_eq!(eval("-7 / 2"), -3.0);
    assert_eq!(eval("-7 % 2"), -1.0);
    assert_eq!(eval("(double)7 / 2"), 3.5);
    assert_eq!(eval("(int)3.9"), 3.0);
}

#[test]
fn string_concatenation_renders_numbers() {
    let src = "string Calculate(double d) { return \"M\" + d; }";
    let result = run(src, &ResolvedInputs::new().number("d", 16.0));
    assert_eq!(
        result.get(RETURN_VALUE_KEY),
        Some(&Value::Text("M16".to_string()))
    );
}

#[test]
fn integer_divide_by_zero_faults_with_location() {
    let src = "\
double Calculate(int a, int b, out double r)
{
    r = a / b;
    return r;
}";
    let mut inputs = ResolvedInputs::new();
    inputs.insert("a", Value::Number(1.0));
    inputs.insert("b", Value::Number(0.0));
    let fault = run_fault(src, &inputs);
    assert_eq!(fault.message, "Attempted to divide by zero.");
    let location = fault.location.expect("fault has a location");
    assert_eq!(location.procedure, "Calculate");
    assert_eq!(location.line, 3);
    assert_eq!(location.snippet, "    r = a / b;");
    assert!(fault.traceback.is_empty());
}

#[test]
fn double_divide_by_zero_is_infinite() {
    let result = run("r = a / b;", &ResolvedInputs::new().number("a", 1.0));
    assert_eq!(result.number("r"), Some(f64::INFINITY));
}

#[test]
fn throw_surfaces_message() {
    let src = "if (load < 0) { throw new ArgumentException(\"Load must be positive\"); }\nr = load;";
    let fault = run_fault(src, &ResolvedInputs::new().number("load", -1.0));
    assert_eq!(fault.message, "Load must be positive");
    assert_eq!(fault.location.map(|l| l.line), Some(1));

    let result = run(src, &ResolvedInputs::new().number("load", 4.0));
    assert_eq!(result.number("r"), Some(4.0));
}

#[test]
fn rejects_unconvertible_inputs() {
    let src = "double Calculate(int n) { return n; }";
    let fault = run_fault(src, &ResolvedInputs::new().number("n", 2.5));
    assert_eq!(
        fault.message,
        "Input 'n' with value '2.5' cannot be converted to int"
    );

    let fault = run_fault(
        "double Calculate(double d) { return d; }",
        &ResolvedInputs::new().text("d", "wide"),
    );
    assert!(fault.message.contains("cannot be converted to double"));
}

#[test]
fn text_inputs_are_parsed_for_numeric_parameters() {
    let src = "double Calculate(double d, int n) { return d * n; }";
    let inputs = ResolvedInputs::new().text("d", " 2.5 ").text("n", "4");
    assert_eq!(run(src, &inputs).number(RETURN_VALUE_KEY), Some(10.0));
}

#[test]
fn evaluates_math_builtins() {
    assert_eq!(eval("Math.Sqrt(16) + Math.Pow(2, 10)"), 1028.0);
    assert_eq!(eval("Math.Max(3, 7) + Math.Abs(-2)"), 9.0);
    assert_eq!(eval("Math.Min(2.5, 1)"), 1.0);
    assert_eq!(eval("Math.Sign(-3.5)"), -1.0);
    assert_eq!(eval("Math.Floor(-1.5) + Math.Ceiling(1.2)"), 0.0);
    assert!((eval("Math.Log(Math.E)") - 1.0).abs() < 1e-12);
    assert!((eval("Math.Log10(1000)") - 3.0).abs() < 1e-12);
    assert!((eval("Math.Sin(Math.PI / 2)") - 1.0).abs() < 1e-12);
    assert!((eval("System.Math.Cos(0)") - 1.0).abs() < 1e-12);
}

#[test]
fn round_uses_bankers_rounding() {
    assert_eq!(eval("Math.Round(2.5)"), 2.0);
    assert_eq!(eval("Math.Round(3.5)"), 4.0);
    assert_eq!(eval("Math.Round(-2.5)"), -2.0);
    assert!((eval("Math.Round(1.2345, 2)") - 1.23).abs() < 1e-12);
}

#[test]
fn rejects_unknown_math_members_and_overloads() {
    let messages = compile_messages("r = Math.Cube(2);");
    assert!(
        messages
            .iter()
            .any(|m| m.contains("'Math' does not contain a definition for 'Cube'")),
        "{messages:?}"
    );
    let messages = compile_messages("r = Math.Sqrt(1, 2);");
    assert!(
        messages
            .iter()
            .any(|m| m.contains("No overload for method 'Sqrt' takes 2 arguments")),
        "{messages:?}"
    );
}

#[test]
fn calls_helpers_in_same_class() {
    let src = "\
double Area(double d) { return Math.PI * d * d / 4; }
double Calculate(double d, out double area)
{
    area = Area(d);
    return area;
}";
    let result = run(src, &ResolvedInputs::new().number("d", 2.0));
    let area = result.number("area").expect("area is numeric");
    assert!((area - std::f64::consts::PI).abs() < 1e-12);
}

#[test]
fn calls_helpers_across_classes() {
    let src = "\
class BoltCheck
{
    public double Calculate(double d, out double area)
    {
        area = Geometry.Area(d);
        return area;
    }
}
class Geometry
{
    public static double Area(double d) { return d * d; }
}";
    let result = run(src, &ResolvedInputs::new().number("d", 3.0));
    assert_eq!(result.number("area"), Some(9.0));
}

#[test]
fn helper_fault_records_call_chain() {
    let src = "\
void Check(double x)
{
    if (x < 0) { throw new Exception(\"negative\"); }
}
double Calculate(double x)
{
    Check(x);
    return x * 2;
}";
    assert_eq!(
        run(src, &ResolvedInputs::new().number("x", 2.0)).number(RETURN_VALUE_KEY),
        Some(4.0)
    );

    let fault = run_fault(src, &ResolvedInputs::new().number("x", -1.0));
    assert_eq!(fault.message, "negative");
    let location = fault.location.as_ref().expect("fault has a location");
    assert_eq!(location.procedure, "Check");
    assert_eq!(location.line, 3);
    assert_eq!(fault.traceback.len(), 1);
    assert_eq!(fault.traceback[0].procedure, "Calculate");
    assert_eq!(fault.traceback[0].line, 7);
    assert!(fault.to_string().contains("called from Calculate"));
}

#[test]
fn rejects_recursive_helpers() {
    let src = "\
double Down(double x) { return Down(x - 1); }
double Calculate(double x) { return Down(x); }";
    let messages = compile_messages(src);
    assert!(
        messages
            .iter()
            .any(|m| m.contains("Recursive call to 'Down' is not supported")),
        "{messages:?}"
    );

    let mutual = "\
double Ping(double x) { return Pong(x); }
double Pong(double x) { return Ping(x); }
double Calculate(double x) { return Ping(x); }";
    let messages = compile_messages(mutual);
    assert!(
        messages.iter().any(|m| m.contains("Recursive call to")),
        "{messages:?}"
    );
}

#[test]
fn rejects_void_helper_used_as_value() {
    let src = "\
void Log(double x) { }
double Calculate(double x) { return Log(x); }";
    let messages = compile_messages(src);
    assert!(
        messages
            .iter()
            .any(|m| m.contains("Method 'Log' returns void and cannot be used as a value")),
        "{messages:?}"
    );
}

#[test]
fn each_compilation_gets_a_fresh_identity() {
    let src = "r = a * 2;";
    let first = compile_formula(src).expect("compile should succeed");
    let second = compile_formula(src).expect("compile should succeed");
    assert_ne!(first.id(), second.id());
    assert_ne!(first.assembly_name(), second.assembly_name());
    assert!(first.assembly_name().starts_with("DynamicCalculation_"));
    assert_eq!(first.source_digest(), second.source_digest());
    assert_eq!(first.source_digest(), source_digest(src));
}

#[test]
fn shared_unit_runs_isolated_across_threads() {
    let src = "\
double Calculate(double x, out double sq)
{
    double acc = 0;
    acc += x;
    acc *= x;
    sq = acc;
    return sq + 1;
}";
    let unit = compile_formula(src).expect("compile should succeed");
    let results: Vec<(f64, Option<f64>)> = std::thread::scope(|scope| {
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let unit = &unit;
                scope.spawn(move || {
                    let x = f64::from(i);
                    let result = unit
                        .execute(&ResolvedInputs::new().number("x", x))
                        .expect("execution should succeed");
                    (x, result.number("sq"))
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|h| h.join().expect("worker should not panic"))
            .collect()
    });
    for (x, sq) in results {
        assert_eq!(sq, Some(x * x));
    }
}

proptest! {
    #[test]
    fn execution_is_deterministic(a in -1.0e6f64..1.0e6, b in -1.0e6f64..1.0e6) {
        let unit = compile_formula("r = a * b + Math.Abs(a) - b / 3;").unwrap();
        let inputs = ResolvedInputs::new().number("a", a).number("b", b);
        let first = unit.execute(&inputs).unwrap();
        let second = unit.execute(&inputs).unwrap();
        prop_assert_eq!(&first, &second);
        prop_assert_eq!(first.number("r"), Some(a * b + a.abs() - b / 3.0));
    }

    #[test]
    fn integer_arithmetic_matches_truncating_division(a in -10_000i64..10_000, b in 1i64..100) {
        let unit = compile_formula(
            "double Calculate(int a, int b, out double q, out double m) { q = a / b; m = a % b; return q; }",
        )
        .unwrap();
        let mut inputs = ResolvedInputs::new();
        inputs.insert("a", Value::Number(a as f64));
        inputs.insert("b", Value::Number(b as f64));
        let result = unit.execute(&inputs).unwrap();
        prop_assert_eq!(result.number("q"), Some((a / b) as f64));
        prop_assert_eq!(result.number("m"), Some((a % b) as f64));
    }
}

// Card pipeline scenarios.

const BOLT_SOURCE: &str = "\
public double Calculate(double boltDia, double tensileStrength, int numberOfBolts, out double capacity)
{
    double area = Math.PI * Math.Pow(boltDia / 2, 2);
    capacity = area * tensileStrength * numberOfBolts / 10000.0;
    return capacity;
}";

const FU_GRADE_830: AppConstantId = AppConstantId(11);
const JOB_FU: GlobalConstantId = GlobalConstantId(21);

fn bolt_card() -> Card {
    Card::new(CardId(1), "Bolt group tension", BOLT_SOURCE)
        .with_inputs(vec![
            VariableSpec::new("boltDia", ValueType::Number).with_unit("mm"),
            VariableSpec::new("tensileStrength", ValueType::Number)
                .with_unit("MPa")
                .with_default(FU_GRADE_830),
            VariableSpec::new("numberOfBolts", ValueType::Integer),
            VariableSpec::new("designLoad", ValueType::Number).with_unit("kN"),
        ])
        .with_outputs(vec![VariableSpec::new("capacity", ValueType::Number).with_unit("kN")])
        .with_design_load("designLoad")
        .with_capacity("capacity")
}

fn bolt_store() -> ConstantStore {
    let mut store = ConstantStore::for_job(JobId(5));
    store
        .library
        .insert(AppConstant::new(FU_GRADE_830, "fu_Grade830", 830.0).with_unit("MPa"))
        .unwrap();
    store
        .job
        .derive_from(JOB_FU, store.library.get(FU_GRADE_830).unwrap())
        .unwrap();
    store
}

fn bolt_instance(id: i64, design_load: f64) -> CardInstance {
    let mut instance = CardInstance::new(CardInstanceId(id), CardId(1), RevisionId(1));
    instance.set_local("boltDia", 16.0);
    instance.set_local("numberOfBolts", 4.0);
    instance.set_local("designLoad", design_load);
    instance.bind("tensileStrength", JOB_FU);
    instance
}

fn expected_bolt_capacity() -> f64 {
    std::f64::consts::PI * 64.0 * 830.0 * 4.0 / 10000.0
}

#[test]
fn bolt_group_passes_under_capacity() {
    let calculator = Calculator::default();
    let card = bolt_card();
    let store = bolt_store();
    let mut instance = bolt_instance(1, 50.0);

    let record = calculator
        .calculate(&card, &instance, &store)
        .expect("calculation should succeed");
    let capacity = record.capacity.expect("capacity is numeric");
    assert!((capacity - expected_bolt_capacity()).abs() < 1e-9);
    assert!((capacity - 66.85).abs() < 0.1, "capacity {capacity}");
    assert_eq!(record.design_load, Some(50.0));
    assert_eq!(record.verdict, Verdict::Pass);

    let strength = record
        .inputs
        .get("tensileStrength")
        .expect("snapshot records bound input");
    assert_eq!(strength.value, Value::Number(830.0));
    assert!(matches!(strength.provenance, Provenance::Global { .. }));
    assert!(record.outputs.contains_key("capacity"));
    assert!(record.outputs.contains_key(RETURN_VALUE_KEY));

    instance.apply(Ok(record));
    assert_eq!(instance.verdict(), Some(Verdict::Pass));
}

#[test]
fn bolt_group_fails_over_capacity() {
    let calculator = Calculator::default();
    let record = calculator
        .calculate(&bolt_card(), &bolt_instance(2, 80.0), &bolt_store())
        .expect("calculation should succeed");
    assert_eq!(record.verdict, Verdict::Fail);
}

#[test]
fn override_replaces_bound_value() {
    let calculator = Calculator::default();
    let mut instance = bolt_instance(3, 50.0);
    instance
        .override_input("tensileStrength", 400.0)
        .expect("input is bound");
    let record = calculator
        .calculate(&bolt_card(), &instance, &bolt_store())
        .expect("calculation should succeed");
    let expected = std::f64::consts::PI * 64.0 * 400.0 * 4.0 / 10000.0;
    assert!((record.capacity.unwrap() - expected).abs() < 1e-9);
    assert_eq!(record.verdict, Verdict::Fail);
    assert!(matches!(
        record.inputs.get("tensileStrength").map(|e| &e.provenance),
        Some(Provenance::Override { .. })
    ));
}

#[test]
fn removed_constant_fails_and_keeps_prior_record() {
    let calculator = Calculator::default();
    let card = bolt_card();
    let mut store = bolt_store();
    let mut instance = bolt_instance(4, 50.0);

    let outcome = calculator.calculate(&card, &instance, &store);
    instance.apply(outcome);
    let prior = instance.record.clone().expect("first run stored");

    store.job.remove(JOB_FU).expect("constant exists");
    let failure = calculator
        .calculate(&card, &instance, &store)
        .expect_err("dangling binding should fail");
    assert!(matches!(
        failure.error,
        CalcError::DanglingBinding {
            ref variable,
            reference: DanglingRef::GlobalConstant(JOB_FU),
        } if variable == "tensileStrength"
    ));
    assert!(!failure.is_card_level());

    instance.apply(Err(failure));
    assert_eq!(instance.record.as_ref(), Some(&prior));
    assert!(instance.last_failure.is_some());
    assert_eq!(instance.verdict(), Some(Verdict::Pass));
}

#[test]
fn missing_input_without_default_is_reported() {
    let calculator = Calculator::default();
    let mut instance = CardInstance::new(CardInstanceId(5), CardId(1), RevisionId(1));
    instance.set_local("boltDia", 16.0);
    instance.bind("tensileStrength", JOB_FU);
    instance.set_local("designLoad", 50.0);
    let failure = calculator
        .calculate(&bolt_card(), &instance, &bolt_store())
        .expect_err("numberOfBolts is missing");
    assert!(matches!(
        failure.error,
        CalcError::MissingRequiredInput { ref variable } if variable == "numberOfBolts"
    ));
}

#[test]
fn non_integral_integer_input_is_a_type_mismatch() {
    let calculator = Calculator::default();
    let mut instance = bolt_instance(6, 50.0);
    instance.set_local("numberOfBolts", 2.5);
    let failure = calculator
        .calculate(&bolt_card(), &instance, &bolt_store())
        .expect_err("2.5 is not an integer");
    assert!(matches!(failure.error, CalcError::TypeMismatch { .. }));
}

#[test]
fn broken_formula_is_a_card_level_failure() {
    let calculator = Calculator::default();
    let card = Card::new(CardId(9), "Broken", "capacity = load * ;");
    let instance = CardInstance::new(CardInstanceId(1), CardId(9), RevisionId(1));
    let failure = calculator
        .calculate(&card, &instance, &ConstantStore::for_job(JobId(1)))
        .expect_err("formula does not parse");
    assert!(matches!(failure.error, CalcError::Compile(_)));
    assert!(failure.is_card_level());
}

#[test]
fn missing_capacity_yields_warning() {
    let calculator = Calculator::default();
    let card = Card::new(CardId(2), "Ratio", "ratio = load / 2;")
        .with_inputs(vec![VariableSpec::new("load", ValueType::Number)])
        .with_design_load("load")
        .with_capacity("capacity");
    let mut instance = CardInstance::new(CardInstanceId(1), CardId(2), RevisionId(1));
    instance.set_local("load", 10.0);
    let record = calculator
        .calculate(&card, &instance, &ConstantStore::for_job(JobId(1)))
        .expect("calculation should succeed");
    assert_eq!(record.capacity, None);
    assert_eq!(record.verdict, Verdict::Warning);
}

#[test]
fn calculator_reuses_cached_units() {
    let calculator = Calculator::default();
    let card = bolt_card();
    let first = calculator.compile(&card).expect("compile should succeed");
    let second = calculator.compile(&card).expect("compile should succeed");
    assert_eq!(first.id(), second.id());
    assert_eq!(calculator.cache().len(), 1);

    let uncached = Calculator::new(EngineConfig {
        cache_compiled_units: false,
        ..EngineConfig::default()
    });
    let a = uncached.compile(&card).expect("compile should succeed");
    let b = uncached.compile(&card).expect("compile should succeed");
    assert_ne!(a.id(), b.id());
    assert!(uncached.cache().is_empty());
}

#[test]
fn batch_outcomes_follow_request_order() {
    let card = bolt_card();
    let store = bolt_store();
    let loads = [10.0, 90.0, 50.0, 70.0, 66.0];
    let instances: Vec<CardInstance> = loads
        .iter()
        .enumerate()
        .map(|(i, load)| bolt_instance(i as i64 + 10, *load))
        .collect();
    let requests: Vec<CalculationRequest<'_>> = instances
        .iter()
        .map(|instance| CalculationRequest {
            card: &card,
            instance,
        })
        .collect();

    let expected: Vec<Verdict> = loads
        .iter()
        .map(|load| evaluate(Some(*load), Some(expected_bolt_capacity())))
        .collect();

    for config in [
        EngineConfig::default(),
        EngineConfig {
            parallel_batches: false,
            ..EngineConfig::default()
        },
        EngineConfig {
            max_threads: Some(2),
            ..EngineConfig::default()
        },
    ] {
        let calculator = Calculator::new(config);
        let verdicts: Vec<Verdict> = calculator
            .calculate_batch(&requests, &store)
            .into_iter()
            .map(|outcome| outcome.expect("calculation should succeed").verdict)
            .collect();
        assert_eq!(verdicts, expected);
    }
}

#[test]
fn legacy_schema_and_bindings_drive_a_calculation() {
    let schema = r#"[
        {"name": "width", "type": "double", "unit": "mm"},
        {"name": "depth", "type": "double", "unit": "mm"}
    ]"#;
    let inputs = Card::parse_variable_schema(schema).expect("schema is valid");
    let card = Card::new(CardId(3), "Section", "area = width * depth;")
        .with_inputs(inputs)
        .with_outputs(Card::parse_variable_schema("{}").expect("empty schema"));

    let locals = [("width".to_string(), Value::Number(3.0))].into_iter().collect();
    let bindings = Default::default();
    let overrides = Default::default();
    let mut instance = CardInstance::from_legacy_maps(
        CardInstanceId(1),
        CardId(3),
        RevisionId(1),
        locals,
        bindings,
        overrides,
    );
    instance.set_local("depth", 4.0);

    let record = Calculator::default()
        .calculate(&card, &instance, &ConstantStore::for_job(JobId(1)))
        .expect("calculation should succeed");
    assert_eq!(record.outputs.get("area"), Some(&Value::Number(12.0)));
    assert_eq!(record.verdict, Verdict::Warning);
    let json = record.results_json().expect("results serialize");
    assert!(json.contains("\"area\":12.0"), "{json}");
}
