use jobshell::Interpreter;

fn main() {
    if let Err(e) = Interpreter::default().repl() {
        eprintln!("jobshell: {e}");
        std::process::exit(1);
    }
}
