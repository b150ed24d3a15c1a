use chrono::NaiveDate;
use lesson_calendar::operations::{add_extra_lesson, add_national_holidays, delete_lesson, retype_lesson};
use lesson_calendar::{
    CalendarBook, CalendarStore, EngineConfig, LessonType, SqliteCalendarStore, expand_dates,
    export_lessons_to_json, export_summaries_to_csv, generate_calendar, load_book_from_json,
    renumber, save_book_to_json,
};
use polars::prelude::{AnyValue, DataFrame};
use std::io::{self, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn cell_text(av: &AnyValue) -> String {
    match av {
        AnyValue::Null => String::new(),
        AnyValue::Int32(v) => v.to_string(),
        AnyValue::UInt32(v) => v.to_string(),
        AnyValue::String(s) => s.to_string(),
        _ => av.to_string(),
    }
}

fn render_df_as_text_table(df: &DataFrame) -> String {
    let columns = df.get_columns();
    let col_names: Vec<String> = columns.iter().map(|c| c.name().to_string()).collect();

    let mut widths: Vec<usize> = col_names.iter().map(|n| n.chars().count()).collect();
    let mut cells: Vec<Vec<String>> = Vec::with_capacity(df.height());
    for row_idx in 0..df.height() {
        let mut row = Vec::with_capacity(columns.len());
        for (ci, col) in columns.iter().enumerate() {
            let s = col.get(row_idx).map(|av| cell_text(&av)).unwrap_or_default();
            widths[ci] = widths[ci].max(s.chars().count());
            row.push(s);
        }
        cells.push(row);
    }

    let mut sep = String::from("+");
    for w in &widths {
        sep.push_str(&"-".repeat(*w + 2));
        sep.push('+');
    }

    let render_row = |values: &[String]| {
        let mut line = String::from("|");
        for (i, value) in values.iter().enumerate() {
            let pad = widths[i].saturating_sub(value.chars().count());
            line.push(' ');
            line.push_str(value);
            line.push_str(&" ".repeat(pad));
            line.push_str(" |");
        }
        line
    };

    let mut out = String::new();
    out.push_str(&sep);
    out.push('\n');
    out.push_str(&render_row(&col_names));
    out.push('\n');
    out.push_str(&sep);
    out.push('\n');
    for row in &cells {
        out.push_str(&render_row(row));
        out.push('\n');
    }
    out.push_str(&sep);
    out.push('\n');
    out
}

fn print_help() {
    println!(
        "Commands:\n  help                               Show this help\n  config <file.toml>                 Load engine settings\n  load <file.json>                   Load a calendar snapshot\n  open [file.db]                     Open (and load) a SQLite store\n  save [file.json]                   Save to the open store, or to a JSON snapshot\n  classes                            List classes\n  generate <class> [all|new]         Generate the lesson calendar (default: all)\n  renumber <class>                   Renumber lessons\n  show <class>                       Show the lesson calendar\n  delete <lesson>                    Delete a lesson (backfills professional classes)\n  retype <lesson> <type>             Change a lesson type (normal, strike, ...)\n  extra <class> <YYYY-MM-DD> <n>     Add an extra lesson with n slots\n  holidays <year>                    Add national holidays to an academic year\n  expand <text...>                   Expand a PT date expression\n  export json|csv <class> <path>     Export lessons or the summary sheet\n  quit|exit                          Exit"
    );
}

fn resolve_class(book: &CalendarBook, arg: Option<&str>) -> Option<i32> {
    let arg = arg?;
    match arg.parse::<i32>() {
        Ok(id) if book.class(id).is_some() => Some(id),
        _ => book.class_by_name(arg).map(|c| c.id),
    }
}

fn show_class(book: &CalendarBook, class_id: i32) {
    match book.lesson_frame(class_id) {
        Ok(df) => println!("{}", render_df_as_text_table(&df)),
        Err(e) => println!("Error: {}", e),
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let mut book = CalendarBook::new();
    let mut store: Option<SqliteCalendarStore> = None;

    println!("Lesson Calendar (CLI) - type 'help' for commands\n");

    let stdin = io::stdin();
    let mut line = String::new();
    loop {
        print!("> ");
        let _ = io::stdout().flush();
        line.clear();
        match stdin.read_line(&mut line) {
            Ok(0) | Err(_) => break,
            Ok(_) => {}
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }

        let mut parts = input.split_whitespace();
        let cmd = parts.next().unwrap_or("");

        match cmd {
            "help" => print_help(),
            "quit" | "exit" => break,
            "config" => match parts.next() {
                Some(path) => match EngineConfig::from_file(path) {
                    Ok(config) => {
                        book.set_config(config);
                        println!("Settings loaded.");
                    }
                    Err(e) => println!("Error: {}", e),
                },
                None => println!("Usage: config <file.toml>"),
            },
            "load" => match parts.next() {
                Some(path) => match load_book_from_json(path) {
                    Ok(loaded) => {
                        book = loaded;
                        println!("Loaded {} class(es), {} lesson(s).", book.classes.len(), book.lessons.len());
                    }
                    Err(e) => println!("Error: {}", e),
                },
                None => println!("Usage: load <file.json>"),
            },
            "open" => {
                let path = parts
                    .next()
                    .map(PathBuf::from)
                    .or_else(|| book.config().database_path.clone());
                let Some(path) = path else {
                    println!("Usage: open <file.db> (or set database_path in the settings)");
                    continue;
                };
                match SqliteCalendarStore::new(&path) {
                    Ok(opened) => {
                        let shown = path.display();
                        match opened.load_book() {
                            Ok(Some(loaded)) => {
                                book = loaded;
                                println!("Opened {} ({} class(es)).", shown, book.classes.len());
                            }
                            Ok(None) => println!("Opened {} (empty).", shown),
                            Err(e) => println!("Error: {}", e),
                        }
                        store = Some(opened);
                    }
                    Err(e) => println!("Error: {}", e),
                }
            }
            "save" => {
                let result = match (parts.next(), &store) {
                    (Some(path), _) => save_book_to_json(&book, path),
                    (None, Some(store)) => store.save_book(&book),
                    (None, None) => {
                        println!("No store open. Use: save <file.json>");
                        continue;
                    }
                };
                match result {
                    Ok(()) => println!("Saved."),
                    Err(e) => println!("Error: {}", e),
                }
            }
            "classes" => {
                if book.classes.is_empty() {
                    println!("No classes.");
                }
                for class in book.classes.values() {
                    println!(
                        "{:>4}  {:<12} {:<13} {}",
                        class.id,
                        class.name,
                        class.track.as_str(),
                        class.periodization.as_str()
                    );
                }
            }
            "generate" => {
                let Some(class_id) = resolve_class(&book, parts.next()) else {
                    println!("Usage: generate <class> [all|new]");
                    continue;
                };
                let recalculate_all = !matches!(parts.next(), Some("new"));
                match generate_calendar(&mut book, class_id, recalculate_all) {
                    Ok(created) => println!("Generated {} lesson(s).", created),
                    Err(e) => println!("Error: {}", e),
                }
            }
            "renumber" => {
                let Some(class_id) = resolve_class(&book, parts.next()) else {
                    println!("Usage: renumber <class>");
                    continue;
                };
                match renumber(&mut book, class_id, None) {
                    Ok(summary) => println!("Renumbered ({})", summary.to_cli_summary()),
                    Err(e) => println!("Error: {}", e),
                }
            }
            "show" => match resolve_class(&book, parts.next()) {
                Some(class_id) => show_class(&book, class_id),
                None => println!("Usage: show <class>"),
            },
            "delete" => {
                let Some(lesson_id) = parts.next().and_then(|s| s.parse::<i32>().ok()) else {
                    println!("Usage: delete <lesson>");
                    continue;
                };
                match delete_lesson(&mut book, lesson_id) {
                    Ok(summary) => println!("Deleted ({})", summary.to_cli_summary()),
                    Err(e) => println!("Error: {}", e),
                }
            }
            "retype" => {
                let lesson_id = parts.next().and_then(|s| s.parse::<i32>().ok());
                let lesson_type = parts.next().and_then(LessonType::from_str);
                match (lesson_id, lesson_type) {
                    (Some(lesson_id), Some(lesson_type)) => match retype_lesson(&mut book, lesson_id, lesson_type) {
                        Ok(summary) => println!("Retyped ({})", summary.to_cli_summary()),
                        Err(e) => println!("Error: {}", e),
                    },
                    _ => println!("Usage: retype <lesson> <type>"),
                }
            }
            "extra" => {
                let class_id = resolve_class(&book, parts.next());
                let date = parts.next().and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok());
                let count = parts.next().and_then(|s| s.parse::<u32>().ok());
                match (class_id, date, count) {
                    (Some(class_id), Some(date), Some(count)) => {
                        match add_extra_lesson(&mut book, class_id, date, count, None, None) {
                            Ok(id) => println!("Extra lesson {} added.", id),
                            Err(e) => println!("Error: {}", e),
                        }
                    }
                    _ => println!("Usage: extra <class> <YYYY-MM-DD> <n>"),
                }
            }
            "holidays" => match parts.next().and_then(|s| s.parse::<i32>().ok()) {
                Some(year_id) => match add_national_holidays(&mut book, year_id) {
                    Ok(added) => println!("Added {} holiday(s).", added),
                    Err(e) => println!("Error: {}", e),
                },
                None => println!("Usage: holidays <year>"),
            },
            "expand" => {
                let text: Vec<&str> = parts.collect();
                if text.is_empty() {
                    println!("Usage: expand <text...>");
                    continue;
                }
                match expand_dates(None, Some(&text.join(" "))) {
                    Ok(dates) => {
                        let listed: Vec<String> = dates.iter().map(|d| d.to_string()).collect();
                        println!("{} date(s): {}", dates.len(), listed.join(", "));
                    }
                    Err(e) => println!("Error: {}", e),
                }
            }
            "export" => {
                let format = parts.next();
                let class_id = resolve_class(&book, parts.next());
                let path = parts.next();
                let result = match (format, class_id, path) {
                    (Some("json"), Some(class_id), Some(path)) => export_lessons_to_json(&book, class_id, None, path),
                    (Some("csv"), Some(class_id), Some(path)) => export_summaries_to_csv(&book, class_id, None, path),
                    _ => {
                        println!("Usage: export json|csv <class> <path>");
                        continue;
                    }
                };
                match result {
                    Ok(rows) => println!("Exported {} row(s).", rows),
                    Err(e) => println!("Error: {}", e),
                }
            }
            _ => {
                println!("Unknown command. Type 'help'.");
            }
        }
    }
}
