//! Output built-ins writing to the database output sink.

use super::det;
use crate::{Database, PrologError, Query, Term};
use log::warn;
use std::rc::Rc;

fn emit(query: &Query, text: &str) -> Result<bool, PrologError> {
    query.database().write_str(text).map_err(|err| {
        warn!(target: "hornet::io", "write failed: {}", err);
        PrologError::io_error("write", Term::atom("user_output"))
    })?;
    Ok(true)
}

fn write(query: &mut Query, args: &[Term]) -> Result<bool, PrologError> {
    let text = args[0].display(query.frames()).unquoted().to_string();
    emit(query, &text)
}

fn writeq(query: &mut Query, args: &[Term]) -> Result<bool, PrologError> {
    let text = args[0].display(query.frames()).to_string();
    emit(query, &text)
}

pub(super) fn install(db: &Rc<Database>) -> Result<(), PrologError> {
    det(db, "write", 1, write)?;
    det(db, "print", 1, writeq)?;
    det(db, "writeq", 1, writeq)?;
    det(db, "nl", 0, |q, _| emit(q, "\n"))
}

#[cfg(test)]
mod tests {
    use crate::{func, list, var, Database, SharedBuffer, Term};
    use std::io;

    fn output(goal: Term) -> String {
        let db = Database::new().unwrap();
        let buffer = SharedBuffer::new();
        db.set_output(Box::new(buffer.clone()));
        db.query(&goal).unwrap().solutions().unwrap();
        buffer.contents()
    }

    #[test]
    fn write_resolves_bindings() {
        let goal = func!(",";
            func!("="; var!("X"), list!["a", "B c"]),
            func!(","; func!("write"; func!("f"; var!("X"))), "nl"));
        assert_eq!(output(goal), "f([a, B c])\n");
    }

    #[test]
    fn print_quotes_atoms() {
        let goal = func!(","; func!("print"; "B c"), func!("writeq"; "ok"));
        assert_eq!(output(goal), "'B c'ok");
    }

    struct Broken;

    impl io::Write for Broken {
        fn write(&mut self, _: &[u8]) -> io::Result<usize> {
            Err(io::Error::new(io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn sink_failures_are_io_errors() {
        let db = Database::new().unwrap();
        db.set_output(Box::new(Broken));
        let err = db.query(&func!("write"; "x")).unwrap().ask().unwrap_err();
        assert_eq!(
            err.ball(),
            Some(&func!("io_error"; "write", "user_output"))
        );
    }
}
