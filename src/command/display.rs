//! DDL-like textual dump of command trees.

use std::fmt::{self, Write as _};

use super::{Action, Command, DeltaRoot};

const INDENT: &str = "    ";

impl Command {
    fn write_ddl(&self, out: &mut String, depth: usize) -> fmt::Result {
        let pad = INDENT.repeat(depth);
        write!(out, "{pad}{} {} '{}'", self.action.keyword(), self.kind, self.classname)?;
        if self.action == Action::Rename {
            write!(out, " TO '{}'", self.target_name())?;
        }

        let properties: Vec<_> = self.properties.iter().filter(|p| p.is_applied()).collect();
        if properties.is_empty() && self.subcommands.is_empty() {
            out.push(';');
        } else {
            out.push_str(" {\n");
            for prop in properties {
                match &prop.new_value {
                    Some(value) => writeln!(out, "{pad}{INDENT}SET {} := {value};", prop.name)?,
                    None => writeln!(out, "{pad}{INDENT}RESET {};", prop.name)?,
                }
            }
            for sub in &self.subcommands {
                sub.write_ddl(out, depth + 1)?;
                out.push('\n');
            }
            write!(out, "{pad}}};")?;
        }
        if self.confidence < 1.0 {
            write!(out, "  # confidence {:.2}", self.confidence)?;
        }
        Ok(())
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut out = String::new();
        self.write_ddl(&mut out, 0)?;
        f.write_str(&out)
    }
}

impl fmt::Display for DeltaRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for cmd in &self.commands {
            writeln!(f, "{cmd}")?;
        }
        Ok(())
    }
}
