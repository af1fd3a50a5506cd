//! Plain-text rendering of the list.

use std::fmt::Write;

use todolist_core::ListSnapshot;

pub fn render(snapshot: &ListSnapshot) -> String {
    if snapshot.loading {
        return "Loading todos...\n".to_string();
    }

    let mut out = String::new();
    out.push_str("My Todos\n");
    let _ = writeln!(
        out,
        "{} of {} completed",
        snapshot.completed_count(),
        snapshot.total_count()
    );
    out.push('\n');

    if snapshot.items.is_empty() {
        out.push_str("No todos yet\nAdd your first todo with `todolist add <task>`\n");
        return out;
    }

    for (index, todo) in snapshot.items.iter().enumerate() {
        let mark = if todo.completed { 'x' } else { ' ' };
        let _ = writeln!(out, "#{:<3} [{mark}] {}  ({})", index + 1, todo.task, todo.id);
    }
    out
}
