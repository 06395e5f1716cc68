use pretty_assertions::assert_eq;

use super::*;

#[test]
fn buffer_keeps_text_verbatim() {
    let handler = BufferPrintHandler::new();
    handler.write("a b");
    handler.write("\n");
    handler.write("c");
    assert_eq!(handler.get_output(), "a b\nc");
}

#[test]
fn writeln_appends_newline() {
    let handler = buffer_handler();
    handler.writeln("hello");
    handler.writeln("");
    assert_eq!(handler.get_output(), "hello\n\n");
}

#[test]
fn clear_empties_buffer() {
    let handler = buffer_handler();
    handler.write("x");
    handler.clear();
    assert_eq!(handler.get_output(), "");
}

#[test]
fn silent_and_stdout_capture_nothing() {
    let silent = silent_handler();
    silent.writeln("dropped");
    assert_eq!(silent.get_output(), "");

    let stdout = PrintHandlerImpl::Stdout(StdoutPrintHandler);
    stdout.clear();
    assert_eq!(stdout.get_output(), "");
}

#[test]
fn shared_handler_sees_writes_from_clones() {
    let handler = buffer_handler();
    let other = Arc::clone(&handler);
    other.write("from clone");
    assert_eq!(handler.get_output(), "from clone");
}
