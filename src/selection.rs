//! Selection state shared by the pages and the selector widget.

/// Ordered, de-duplicated set of category keys.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    keys: Vec<String>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn single(key: impl Into<String>) -> Self {
        Self {
            keys: vec![key.into()],
        }
    }

    /// Keys in first-seen order; later duplicates are dropped.
    pub fn from_keys<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut selection = Self::new();
        for key in keys {
            selection.insert(key);
        }
        selection
    }

    /// Returns false if the key was already selected.
    pub fn insert(&mut self, key: impl Into<String>) -> bool {
        let key = key.into();
        if self.contains(&key) {
            return false;
        }
        self.keys.push(key);
        true
    }

    pub fn remove(&mut self, key: &str) -> bool {
        let before = self.keys.len();
        self.keys.retain(|k| k != key);
        self.keys.len() != before
    }

    pub fn toggle(&mut self, key: &str) {
        if !self.remove(key) {
            self.keys.push(key.to_string());
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        self.keys.iter().any(|k| k == key)
    }

    pub fn clear(&mut self) {
        self.keys.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }

    /// Keys of this selection that are not in `known`.
    pub fn missing_from(&self, known: &[String]) -> Vec<String> {
        self.keys
            .iter()
            .filter(|k| !known.contains(k))
            .cloned()
            .collect()
    }
}

impl<S: Into<String>> FromIterator<S> for Selection {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self::from_keys(iter)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionMode {
    /// Exactly one key once choices are known (a select box)
    Single,
    /// Any number of keys, including none (a multiselect)
    Multi,
}

/// Widget state for one page's selector: the offered choices, what is
/// selected and where the cursor is.
#[derive(Debug, Clone)]
pub struct SelectorState {
    mode: SelectionMode,
    choices: Vec<String>,
    selection: Selection,
    cursor: usize,
    initialized: bool,
}

impl SelectorState {
    pub fn new(mode: SelectionMode) -> Self {
        Self {
            mode,
            choices: Vec::new(),
            selection: Selection::new(),
            cursor: 0,
            initialized: false,
        }
    }

    /// Start from an explicit selection (e.g. `--select`). Keys are not
    /// checked against choices, so unknown keys reach the page render.
    pub fn with_selection(mode: SelectionMode, selection: Selection) -> Self {
        let selection = match mode {
            SelectionMode::Single => selection
                .keys()
                .first()
                .map(|k| Selection::single(k.clone()))
                .unwrap_or_default(),
            SelectionMode::Multi => selection,
        };
        Self {
            mode,
            choices: Vec::new(),
            selection,
            cursor: 0,
            initialized: true,
        }
    }

    pub fn mode(&self) -> SelectionMode {
        self.mode
    }

    pub fn choices(&self) -> &[String] {
        &self.choices
    }

    pub fn selection(&self) -> &Selection {
        &self.selection
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Install fresh choices. The first call seeds the selection from
    /// `defaults`; later calls keep the current selection as is. A single
    /// select always ends up holding a choice when any exist.
    pub fn set_choices(&mut self, choices: Vec<String>, defaults: &Selection) {
        let first_install = self.choices.is_empty();
        self.choices = choices;
        if !self.initialized {
            self.selection = defaults
                .iter()
                .filter(|k| self.choices.iter().any(|c| c == k))
                .collect();
            if self.mode == SelectionMode::Single && self.selection.len() > 1 {
                self.selection = Selection::single(self.selection.keys()[0].clone());
            }
            self.initialized = true;
        }
        if self.mode == SelectionMode::Single && self.selection.is_empty() {
            if let Some(first) = self.choices.first() {
                self.selection = Selection::single(first.clone());
            }
        }
        if first_install {
            self.cursor = self
                .selection
                .keys()
                .first()
                .and_then(|k| self.choices.iter().position(|c| c == k))
                .unwrap_or(0);
        }
        self.cursor = self.cursor.min(self.choices.len().saturating_sub(1));
    }

    pub fn cursor_up(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn cursor_down(&mut self) {
        if self.cursor + 1 < self.choices.len() {
            self.cursor += 1;
        }
    }

    pub fn cursor_first(&mut self) {
        self.cursor = 0;
    }

    pub fn cursor_last(&mut self) {
        self.cursor = self.choices.len().saturating_sub(1);
    }

    pub fn current_choice(&self) -> Option<&str> {
        self.choices.get(self.cursor).map(String::as_str)
    }

    /// Apply the choice under the cursor: toggle it (multi) or make it the
    /// selection (single). Returns true when the selection changed.
    pub fn activate(&mut self) -> bool {
        let Some(choice) = self.current_choice().map(str::to_string) else {
            return false;
        };
        match self.mode {
            SelectionMode::Multi => {
                self.selection.toggle(&choice);
                true
            }
            SelectionMode::Single => {
                if self.selection.contains(&choice) {
                    return false;
                }
                self.selection = Selection::single(choice);
                true
            }
        }
    }

    /// Empty a multiselect. Single selects cannot be emptied.
    pub fn clear(&mut self) -> bool {
        if self.mode == SelectionMode::Multi && !self.selection.is_empty() {
            self.selection.clear();
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn choices() -> Vec<String> {
        ["BAYVIEW", "CENTRAL", "MISSION", "PARK"]
            .iter()
            .map(|s| s.to_string())
            .collect()
    }

    #[test]
    fn selection_dedups_in_order() {
        let s = Selection::from_keys(["PARK", "BAYVIEW", "PARK"]);
        assert_eq!(s.keys(), &["PARK".to_string(), "BAYVIEW".to_string()]);
        assert_eq!(s.missing_from(&choices()), Vec::<String>::new());
        let s = Selection::from_keys(["PIER"]);
        assert_eq!(s.missing_from(&choices()), vec!["PIER".to_string()]);
    }

    #[test]
    fn defaults_are_filtered_against_choices() {
        let mut state = SelectorState::new(SelectionMode::Multi);
        state.set_choices(choices(), &Selection::from_keys(["PARK", "NOWHERE", "BAYVIEW"]));
        assert_eq!(state.selection(), &Selection::from_keys(["PARK", "BAYVIEW"]));
        assert_eq!(state.current_choice(), Some("PARK"));
    }

    #[test]
    fn later_choices_keep_user_selection() {
        let mut state = SelectorState::new(SelectionMode::Multi);
        state.set_choices(choices(), &Selection::from_keys(["PARK"]));
        assert!(state.clear());
        state.set_choices(choices(), &Selection::from_keys(["PARK"]));
        assert!(state.selection().is_empty());
    }

    #[test]
    fn single_select_falls_back_to_first_choice() {
        let mut state = SelectorState::new(SelectionMode::Single);
        state.set_choices(choices(), &Selection::from_keys(["ASSAULT"]));
        assert_eq!(state.selection(), &Selection::single("BAYVIEW"));
        assert!(!state.clear());
    }

    #[test]
    fn activate_toggles_or_replaces() {
        let mut multi = SelectorState::new(SelectionMode::Multi);
        multi.set_choices(choices(), &Selection::new());
        multi.cursor_down();
        assert!(multi.activate());
        assert!(multi.selection().contains("CENTRAL"));
        assert!(multi.activate());
        assert!(multi.selection().is_empty());

        let mut single = SelectorState::new(SelectionMode::Single);
        single.set_choices(choices(), &Selection::single("PARK"));
        single.cursor_first();
        assert!(single.activate());
        assert_eq!(single.selection(), &Selection::single("BAYVIEW"));
        assert!(!single.activate());
    }

    #[test]
    fn cursor_stays_put_across_refreshes() {
        let mut state = SelectorState::new(SelectionMode::Multi);
        state.set_choices(choices(), &Selection::from_keys(["CENTRAL"]));
        assert_eq!(state.cursor(), 1);
        state.cursor_last();
        state.activate();
        state.set_choices(choices(), &Selection::new());
        assert_eq!(state.current_choice(), Some("PARK"));
        state.set_choices(vec!["BAYVIEW".to_string()], &Selection::new());
        assert_eq!(state.cursor(), 0);
    }

    #[test]
    fn explicit_selection_survives_choices() {
        let mut state = SelectorState::with_selection(
            SelectionMode::Multi,
            Selection::from_keys(["PIER", "PARK"]),
        );
        state.set_choices(choices(), &Selection::from_keys(["BAYVIEW"]));
        assert_eq!(state.selection(), &Selection::from_keys(["PIER", "PARK"]));
    }
}
