use crate::entry::FileEntry;
use crate::size::format_size;
use console::{Key, Term, style};
use std::io;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct GroupedItem {
    pub entry: FileEntry,
    pub selected: bool,
}

/// Entries sharing one extension.
#[derive(Debug)]
pub struct Group {
    pub extension: String,
    pub items: Vec<GroupedItem>,
    pub collapsed: bool,
}

impl Group {
    pub fn label(&self) -> String {
        if self.extension.is_empty() {
            "(no extension)".to_string()
        } else {
            format!(".{}", self.extension)
        }
    }

    pub fn total_size(&self) -> u64 {
        self.items.iter().map(|i| i.entry.size).sum()
    }

    pub fn all_selected(&self) -> bool {
        self.items.iter().all(|i| i.selected)
    }

    pub fn none_selected(&self) -> bool {
        self.items.iter().all(|i| !i.selected)
    }

    pub fn toggle_all(&mut self) {
        let new_state = !self.all_selected();
        for item in &mut self.items {
            item.selected = new_state;
        }
    }
}

/// Terminal multi-select over scan entries, grouped by extension.
pub struct GroupedSelector {
    groups: Vec<Group>,
    cursor: usize,
    max_path_len: usize,
    now: u64,
}

enum CursorPosition {
    GroupHeader(usize),
    Item(usize, usize),
}

impl GroupedSelector {
    /// Groups appear in the order their first entry does, so the caller's
    /// sort carries over. Everything starts selected.
    pub fn new<'a, I>(entries: I, now: u64) -> Self
    where
        I: IntoIterator<Item = &'a FileEntry>,
    {
        let mut groups: Vec<Group> = Vec::new();

        for entry in entries {
            let item = GroupedItem {
                entry: entry.clone(),
                selected: true,
            };
            match groups.iter_mut().find(|g| g.extension == entry.extension) {
                Some(group) => group.items.push(item),
                None => groups.push(Group {
                    extension: entry.extension.clone(),
                    items: vec![item],
                    collapsed: false,
                }),
            }
        }

        let max_path_len = groups
            .iter()
            .flat_map(|g| g.items.iter())
            .map(|i| i.entry.path.len())
            .max()
            .unwrap_or(50);

        Self {
            groups,
            cursor: 0,
            max_path_len,
            now,
        }
    }

    pub fn groups(&self) -> &[Group] {
        &self.groups
    }

    fn total_lines(&self) -> usize {
        self.groups
            .iter()
            .map(|g| if g.collapsed { 1 } else { 1 + g.items.len() })
            .sum()
    }

    fn cursor_position(&self) -> CursorPosition {
        let mut line = 0;
        for (gi, group) in self.groups.iter().enumerate() {
            if line == self.cursor {
                return CursorPosition::GroupHeader(gi);
            }
            line += 1;
            if !group.collapsed {
                for ii in 0..group.items.len() {
                    if line == self.cursor {
                        return CursorPosition::Item(gi, ii);
                    }
                    line += 1;
                }
            }
        }
        CursorPosition::GroupHeader(0)
    }

    fn render(&self, term: &Term) -> io::Result<()> {
        let mut output = String::new();
        let position = self.cursor_position();

        for (gi, group) in self.groups.iter().enumerate() {
            let is_group_cursor = matches!(position, CursorPosition::GroupHeader(i) if i == gi);

            let checkbox = if group.all_selected() {
                style("[✓]").green()
            } else if group.none_selected() {
                style("[ ]").dim()
            } else {
                style("[~]").yellow()
            };

            let collapse_indicator = if group.collapsed { "▶" } else { "▼" };

            let header = format!(
                "{} {} {} ({} items, {})",
                checkbox,
                collapse_indicator,
                group.label(),
                group.items.len(),
                format_size(group.total_size())
            );

            if is_group_cursor {
                output.push_str(&format!("{}\n", style(header).reverse()));
            } else {
                output.push_str(&format!("{}\n", style(header).bold()));
            }

            if group.collapsed {
                continue;
            }

            for (ii, item) in group.items.iter().enumerate() {
                let is_item_cursor =
                    matches!(position, CursorPosition::Item(g, i) if g == gi && i == ii);

                let checkbox = if item.selected {
                    style("  [✓]").green()
                } else {
                    style("  [ ]").dim()
                };

                let line = format!(
                    "{} {:<width$}  {:>10}  {:>6}",
                    checkbox,
                    item.entry.path,
                    format_size(item.entry.size),
                    format!("{}d", item.entry.age_days(self.now)),
                    width = self.max_path_len
                );

                if is_item_cursor {
                    output.push_str(&format!("{}\n", style(line).reverse()));
                } else {
                    output.push_str(&format!("{}\n", line));
                }
            }
        }

        output.push_str(&format!(
            "\n{} navigate  {} toggle  {} expand/collapse  {} confirm  {} cancel\n",
            style("↑↓").cyan(),
            style("Space").cyan(),
            style("Tab").cyan(),
            style("Enter").cyan(),
            style("Esc").cyan()
        ));

        term.clear_screen()?;
        term.write_str(&output)?;

        Ok(())
    }

    fn move_up(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
        }
    }

    fn move_down(&mut self) {
        if self.cursor + 1 < self.total_lines() {
            self.cursor += 1;
        }
    }

    fn toggle_current(&mut self) {
        match self.cursor_position() {
            CursorPosition::GroupHeader(gi) => self.groups[gi].toggle_all(),
            CursorPosition::Item(gi, ii) => {
                let item = &mut self.groups[gi].items[ii];
                item.selected = !item.selected;
            }
        }
    }

    fn toggle_collapse(&mut self) {
        if let CursorPosition::GroupHeader(gi) = self.cursor_position() {
            self.groups[gi].collapsed = !self.groups[gi].collapsed;
        }
    }

    fn selected_paths(self) -> Vec<PathBuf> {
        self.groups
            .into_iter()
            .flat_map(|g| g.items)
            .filter(|i| i.selected)
            .map(|i| PathBuf::from(i.entry.path))
            .collect()
    }

    /// Run the picker. Cancelling returns an empty selection.
    pub fn run(mut self) -> io::Result<Vec<PathBuf>> {
        let term = Term::stderr();
        term.hide_cursor()?;

        loop {
            self.render(&term)?;

            match term.read_key()? {
                Key::ArrowUp | Key::Char('k') => self.move_up(),
                Key::ArrowDown | Key::Char('j') => self.move_down(),
                Key::Char(' ') => self.toggle_current(),
                Key::Tab => self.toggle_collapse(),
                Key::Enter => break,
                Key::Escape | Key::Char('q') => {
                    term.show_cursor()?;
                    term.clear_screen()?;
                    return Ok(Vec::new());
                }
                _ => {}
            }
        }

        term.show_cursor()?;
        term.clear_screen()?;

        Ok(self.selected_paths())
    }
}
