//! Companion tracer for Python.
//!
//! Python is not rewritten at all: the engine ships a small tracer program
//! that loads the submitted file and observes it through `sys.settrace`. The
//! tracer buffers everything the program prints, attributes each chunk to the
//! step that produced it, and emits the whole step array as the final line of
//! its standard output. The dispatcher writes both files into the scratch
//! workspace and invokes `python3 <tracer> <program>`.

/// File name the companion tracer is written under, per request.
pub const TRACER_FILE: &str = "tracer.py";

/// File name the submitted program is written under.
pub const PROGRAM_FILE: &str = "program.py";

/// Companion tracer source. Steps are `{line, variables, stdout}` objects;
/// a final `line: 0` step carries output produced after the last traced line
/// or the message of an uncaught exception.
pub const TRACER_SOURCE: &str = r#"import io
import json
import os
import sys

steps = []
target = os.path.abspath(sys.argv[1])

print_buffer = io.StringIO()
sys.stdout = print_buffer


def freeze(value):
    try:
        if isinstance(value, (int, float, str, bool, type(None))):
            return value
        if isinstance(value, (list, tuple, set)):
            return [freeze(item) for item in value]
        if isinstance(value, dict):
            return {str(k): freeze(v) for k, v in value.items()}
        return str(value)
    except Exception:
        return str(value)


def trace(frame, event, arg):
    if event != 'line':
        return trace
    if os.path.abspath(frame.f_code.co_filename) != target:
        return trace

    printed = print_buffer.getvalue()
    print_buffer.truncate(0)
    print_buffer.seek(0)

    variables = {}
    for name, value in frame.f_locals.copy().items():
        if name.startswith('__'):
            continue
        if type(value).__name__ == 'module' or callable(value):
            continue
        try:
            variables[name] = freeze(value)
        except Exception:
            variables[name] = '<unreadable>'

    steps.append({'line': frame.f_lineno, 'variables': variables, 'stdout': printed})
    return trace


try:
    with open(target) as handle:
        source = handle.read()
    code = compile(source, target, 'exec')
    sys.settrace(trace)
    exec(code, {'__name__': '__main__'})
    sys.settrace(None)
    trailing = print_buffer.getvalue()
    if trailing:
        steps.append({'line': 0, 'variables': {}, 'stdout': trailing})
except Exception as exc:
    sys.settrace(None)
    steps.append({'line': 0, 'variables': {}, 'stdout': 'Runtime Error: %s' % exc})

sys.stdout = sys.__stdout__
print(json.dumps(steps))
"#;
