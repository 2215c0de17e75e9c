/// Title filter for the note list. Only titles are searched; bodies are not.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NoteFilter {
    needle: Option<String>,
}

impl NoteFilter {
    pub fn parse(raw: Option<&str>) -> Self {
        let needle = raw
            .map(|query| query.trim().to_lowercase())
            .filter(|query| !query.is_empty());
        Self { needle }
    }

    pub fn is_active(&self) -> bool {
        self.needle.is_some()
    }

    pub fn needle(&self) -> Option<&str> {
        self.needle.as_deref()
    }

    pub fn matches(&self, title: &str) -> bool {
        match &self.needle {
            Some(needle) => title.to_lowercase().contains(needle.as_str()),
            None => true,
        }
    }
}
