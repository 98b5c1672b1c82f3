//! End-to-end pipeline tests: source text through the lexer and
//! generator to a listing, and through the VM to observable output.

use std::io::Read;

use plzero::error::GenError;
use plzero::vm::Vm;
use plzero::{compile_source_silent, CompileError};

fn compile(source: &str) -> plzero::code::Code {
    compile_source_silent(source).expect("compilation should succeed")
}

fn run(source: &str, input: &str) -> String {
    let code = compile(source);
    let mut vm = Vm::new(&code);
    let mut output = Vec::new();
    vm.run(&mut input.as_bytes(), &mut output)
        .expect("program should halt cleanly");
    String::from_utf8(output).unwrap()
}

#[test]
fn minimal_assignment_listing() {
    let code = compile("var x; x := 0.");
    insta::assert_snapshot!(code.to_string().trim_end(), @r"
    7 0 0 2
    6 0 0 1
    6 0 0 4
    1 0 0 0
    4 0 0 4
    8 0 0 0
    11 0 0 3
    ");
}

#[test]
fn constant_write_listing() {
    let code = compile("const c = 42; write c.");
    insta::assert_snapshot!(code.to_string().trim_end(), @r"
    7 0 0 1
    6 0 0 4
    1 0 0 42
    9 0 0 1
    8 0 0 0
    11 0 0 3
    ");
}

#[test]
fn nested_procedure_disassembly() {
    let code = compile("var x; procedure p; x := 3; begin call p; write x end.");
    insta::assert_snapshot!(code.disassemble().trim_end(), @r"
    0000  JMP       0 0 7
    0001  INC       0 0 1
    0002  JMP       0 0 3
    0003  INC       0 0 4
    0004  LIT       0 0 3
    0005  STO       0 1 4
    0006  RTN       0 0 0
    0007  INC       0 0 4
    0008  CAL       0 0 3
    0009  LOD       0 0 4
    0010  SIO_WRITE 0 0 1
    0011  RTN       0 0 0
    0012  SIO_HALT  0 0 3
    ");
}

#[test]
fn factorial_executes() {
    let source = "var n, f; begin n := 5; f := 1; \
                  while n > 1 do begin f := f * n; n := n - 1 end; \
                  write f end.";
    assert_eq!(run(source, ""), "120\n");
}

#[test]
fn squares_from_input() {
    let source = "var x; begin read x; write x; x := x * x; write x end.";
    assert_eq!(run(source, "7\n"), "7\n49\n");
}

#[test]
fn comments_do_not_reach_the_generator() {
    let with = compile("var x; /* counter */ x := 0.");
    let without = compile("var x; x := 0.");
    assert_eq!(with.to_string(), without.to_string());
}

#[test]
fn pipeline_is_deterministic() {
    let source = "var x; procedure p; x := 3; begin call p; write x end.";
    assert_eq!(compile(source).to_string(), compile(source).to_string());
}

#[test]
fn generation_error_carries_its_code() {
    let err = compile_source_silent("const x 5;").unwrap_err();
    match err {
        CompileError::Gen(err) => {
            assert_eq!(err, GenError::EqualExpected);
            assert_eq!(err.code(), 2);
        }
        CompileError::Lex(_) => panic!("expected a generation error"),
    }
}

#[test]
fn lexical_error_stops_the_pipeline() {
    let err = compile_source_silent("var x; x # 1.").unwrap_err();
    assert!(matches!(err, CompileError::Lex(_)));
}

#[test]
fn failed_runs_produce_no_listing() {
    // The driver writes a listing only from a returned Code value; a
    // failed run never yields one.
    assert!(compile_source_silent("x := 1.").is_err());
    assert!(compile_source_silent("var x; x := 0").is_err());
}

#[test]
fn listing_file_round_trip() {
    let code = compile("var x; begin read x; write x end.");
    let mut file = tempfile::NamedTempFile::new().expect("temp file");
    code.write_to(&mut file).expect("listing should write");

    let mut text = String::new();
    file.reopen()
        .expect("reopen")
        .read_to_string(&mut text)
        .expect("read back");
    assert_eq!(text, code.to_string());
}
