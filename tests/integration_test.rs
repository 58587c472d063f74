// Integration tests for the compiler and machine

use pascalc::codegen::CodegenError;
use pascalc::parser::ParseError;
use pascalc::vm::{Machine, Value, VmError};
use pascalc::{compile, parse, CompileError};

fn run_with_input(source: &str, input: &[&str]) -> Result<Vec<String>, VmError> {
    let compilation = compile(source).expect("Compilation failed");
    let mut machine = Machine::new(compilation.instructions)?.with_input(input.iter().copied());
    machine.run()?;
    Ok(machine.terminal().get_output())
}

fn run(source: &str) -> Vec<String> {
    run_with_input(source, &[]).expect("Execution failed")
}

#[test]
fn test_simple_assignment() {
    let source = r#"
        program Simple;
        var x: integer;
        begin
            x := 5;
            writeln(x)
        end.
    "#;

    assert_eq!(run(source), vec!["5"]);
}

#[test]
fn test_array_sum() {
    let source = r#"
        program Sum;
        var
            a: array[1..4] of integer;
            i, s: integer;
        begin
            for i := 1 to 4 do
                a[i] := i;
            s := 0;
            for i := 1 to 4 do
                s := s + a[i];
            writeln('sum: ', s)
        end.
    "#;

    assert_eq!(run(source), vec!["sum: 10"]);
}

#[test]
fn test_array_with_offset_bounds() {
    let source = r#"
        program Offsets;
        var
            a: array[-2..2] of integer;
            i: integer;
        begin
            for i := -2 to 2 do
                a[i] := i * i;
            for i := 2 downto -2 do
                write(a[i], ' ');
            writeln(length(a))
        end.
    "#;

    assert_eq!(run(source), vec!["4 1 0 1 4 5"]);
}

#[test]
fn test_real_arrays_start_at_zero() {
    let source = r#"
        program Reals;
        var v: array[0..2] of real;
        begin
            v[1] := 2;
            writeln(v[0], ' ', v[1] / 4)
        end.
    "#;

    assert_eq!(run(source), vec!["0.0 0.5"]);
}

#[test]
fn test_while_loop() {
    let source = r#"
        program Countdown;
        var n: integer;
        begin
            n := 3;
            while n > 0 do
            begin
                write(n);
                n := n - 1
            end;
            writeln;
            writeln('liftoff')
        end.
    "#;

    assert_eq!(run(source), vec!["321", "liftoff"]);
}

#[test]
fn test_nested_if_else() {
    let source = r#"
        program Classify;
        var i: integer;
        begin
            for i := 1 to 15 do
                if i mod 15 = 0 then
                    writeln('FizzBuzz')
                else if i mod 3 = 0 then
                    writeln('Fizz')
                else if i mod 5 = 0 then
                    writeln('Buzz')
                else
                    writeln(i)
        end.
    "#;

    let output = run(source);
    assert_eq!(output.len(), 15);
    assert_eq!(output[2], "Fizz");
    assert_eq!(output[4], "Buzz");
    assert_eq!(output[14], "FizzBuzz");
    assert_eq!(output[6], "7");
}

#[test]
fn test_boolean_variables() {
    let source = r#"
        program Flags;
        var
            x: integer;
            big, small: boolean;
        begin
            x := 10;
            big := x > 3;
            small := not big;
            if big and not small then
                writeln('big')
            else
                writeln('small');
            writeln(big, small, true or false)
        end.
    "#;

    assert_eq!(run(source), vec!["big", "101"]);
}

#[test]
fn test_strings_and_chars() {
    let source = r#"
        program Text;
        var
            s: string;
            c: char;
        begin
            s := 'hello';
            s[1] := 'H';
            writeln(s, ' ', length(s));
            writeln(s[2], s[5]);
            c := s[1];
            writeln(c, ord(c), ' ', succ(c), pred('b'));
            writeln(chr(65), 'It''s')
        end.
    "#;

    assert_eq!(run(source), vec!["Hello 5", "eo", "H72 Ia", "AIt's"]);
}

#[test]
fn test_char_comparison() {
    let source = r#"
        program Compare;
        var
            s: string;
            c: char;
            i, upper: integer;
        begin
            s := 'PasCal';
            c := 'Z';
            upper := 0;
            for i := 1 to length(s) do
                if (s[i] >= 'A') and (s[i] <= c) then
                    upper := upper + 1;
            writeln(upper);
            if s = 'PasCal' then writeln('same')
        end.
    "#;

    assert_eq!(run(source), vec!["2", "same"]);
}

#[test]
fn test_readln_input() {
    let source = r#"
        program Input;
        var
            n: integer;
            r: real;
            name: string;
            c: char;
        begin
            readln(name);
            readln(n, r);
            readln;
            readln(c);
            writeln('hi ', name);
            writeln(n * 2, ' ', r + 1);
            writeln(c)
        end.
    "#;

    let output = run_with_input(source, &["Ada", "21", "1.5", "skipped", "xyz"]).unwrap();
    assert_eq!(output, vec!["hi Ada", "42 2.5", "x"]);
}

#[test]
fn test_read_into_elements() {
    let source = r#"
        program Elements;
        var
            a: array[1..2] of integer;
            s: string;
        begin
            s := 'cat';
            read(a[2], s[1]);
            writeln(a[2] + 1, ' ', s)
        end.
    "#;

    let output = run_with_input(source, &["41", "b"]).unwrap();
    assert_eq!(output, vec!["42 bat"]);
}

#[test]
fn test_numeric_builtins() {
    let source = r#"
        program Math;
        var
            x: integer;
            r: real;
        begin
            x := -7;
            writeln(abs(x), ' ', abs(4), ' ', abs(-2.5));
            writeln(sqr(x), ' ', sqr(1.5));
            writeln(x mod 3, ' ', x div 2, ' ', 7 / 2, ' ', 7.0 / 2);
            r := sqrt(16);
            writeln(r, ' ', sqrt(2.25));
            if odd(x) then writeln('odd')
        end.
    "#;

    assert_eq!(
        run(source),
        vec!["7 4 2.5", "49 2.25", "-1 -3 3 3.5", "4.0 1.5", "odd"]
    );
}

#[test]
fn test_real_coercion_in_assignment() {
    let source = r#"
        program Coerce;
        var
            r: real;
            i: integer;
        begin
            i := 3;
            r := i;
            r := r + i * 2;
            writeln(r);
            if r > i then writeln('greater')
        end.
    "#;

    assert_eq!(run(source), vec!["9.0", "greater"]);
}

#[test]
fn test_listing_runs_after_reload() {
    let source = r#"
        program Reload;
        var
            s: string;
            i: integer;
        begin
            s := 'say "hi"';
            for i := 1 to 2 do
                writeln(s, ' ', i)
        end.
    "#;

    let compilation = compile(source).unwrap();
    let mut machine = Machine::from_source(&compilation.listing()).unwrap();
    machine.run().unwrap();

    assert_eq!(
        machine.terminal().get_output(),
        vec![r#"say "hi" 1"#, r#"say "hi" 2"#]
    );
}

#[test]
fn test_printed_program_reparses() {
    let source = r#"
        program Round;
        var
            a: array[1..3] of char;
            i: integer;
        begin
            for i := 3 downto 1 do
                if (i > 1) and not (i = 2) then
                    a[i] := 'x'
                else
                    readln(a[i]);
            while i < 10 do i := i * 2 - 1
        end.
    "#;

    let program = parse(source).unwrap();
    let reparsed = parse(&program.to_string()).unwrap();
    assert_eq!(program, reparsed);
}

#[test]
fn test_runtime_errors() {
    let division = r#"
        program Boom;
        var x: integer;
        begin
            x := 0;
            writeln(10 div x)
        end.
    "#;
    assert!(matches!(
        run_with_input(division, &[]),
        Err(VmError::DivisionByZero { .. })
    ));

    let bounds = r#"
        program Bounds;
        var a: array[1..3] of integer;
        begin
            a[4] := 1
        end.
    "#;
    assert!(matches!(
        run_with_input(bounds, &[]),
        Err(VmError::OutOfBounds { index: 3, len: 3, .. })
    ));

    let input = "program NoInput; var n: integer; begin readln(n) end.";
    assert!(matches!(
        run_with_input(input, &[]),
        Err(VmError::InputExhausted { .. })
    ));
}

#[test]
fn test_compile_errors() {
    assert!(matches!(
        compile("program P; begin x := 1 end."),
        Err(CompileError::Codegen(CodegenError::UndeclaredName(name))) if name == "x"
    ));
    assert!(matches!(
        compile("program P; var x: integer; x: real; begin end."),
        Err(CompileError::Codegen(CodegenError::Redeclared(_)))
    ));
    assert!(matches!(
        compile("program P; var s: string; begin s := 1 end."),
        Err(CompileError::Codegen(CodegenError::TypeMismatch { .. }))
    ));
    assert!(matches!(
        compile("program P; begin foo end."),
        Err(CompileError::Codegen(CodegenError::Unsupported(_)))
    ));
    assert!(matches!(
        compile("program P; begin x := 1 end"),
        Err(CompileError::Parse(ParseError::UnexpectedEof { .. }))
    ));
}

#[test]
fn test_final_memory_state() {
    let source = r#"
        program State;
        var
            a: array[1..3] of integer;
            s: string;
        begin
            a[2] := 5;
            a[3] := a[2] * 2;
            s := 'hi';
            s[2] := 'o'
        end.
    "#;

    let compilation = compile(source).unwrap();
    let mut machine = Machine::new(compilation.instructions).unwrap();
    machine.run().unwrap();

    let array = machine.global(0).unwrap();
    let cells: Vec<_> = (0..3).map(|i| machine.heap_cell(array, i)).collect();
    assert_eq!(cells, vec![Some(Value::Int(0)), Some(Value::Int(5)), Some(Value::Int(10))]);
    assert_eq!(machine.heap_cell(array, 3), None);

    let text = machine.global(1).unwrap();
    assert_eq!(machine.string(text), Some("ho"));
    assert_eq!(machine.string(Value::Int(1)), None);
}

#[test]
fn test_long_string_loop() {
    let source = r#"
        program Stars;
        var
            i: integer;
            s: string;
        begin
            for i := 1 to 20000 do
            begin
                s := 'ab';
                s[1] := 'x';
                write(chr(42))
            end;
            writeln;
            writeln(s)
        end.
    "#;

    let compilation = compile(source).unwrap();
    let mut machine = Machine::new(compilation.instructions)
        .unwrap()
        .with_string_limit(8);
    machine.run().unwrap();

    let output = machine.terminal().get_output();
    assert_eq!(output[0].len(), 20000);
    assert_eq!(output[1], "xb");
}
