//! Subject catalogue: letter groups, answer submission and moderation.
//! Stored as a JSON file.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{AppError, Result};
use crate::records::QaRecord;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Category {
    pub id: u64,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subject {
    pub id: u64,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default)]
    pub categories: Vec<Category>,
    #[serde(default)]
    pub answers: Vec<QaRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub materials: Option<serde_json::Value>,
}

impl Subject {
    pub fn new(id: u64, name: &str) -> Self {
        Self {
            id,
            name: name.to_string(),
            file_name: None,
            categories: Vec::new(),
            answers: Vec::new(),
            materials: None,
        }
    }

    pub fn questions_count(&self) -> usize {
        self.answers.len()
    }
}

/// Subject listing entry, without the answers.
#[derive(Debug, Clone, Serialize)]
pub struct SubjectSummary {
    pub id: u64,
    pub name: String,
    pub questions_count: usize,
    pub categories: Vec<Category>,
}

impl From<&Subject> for SubjectSummary {
    fn from(s: &Subject) -> Self {
        Self {
            id: s.id,
            name: s.name.clone(),
            questions_count: s.questions_count(),
            categories: s.categories.clone(),
        }
    }
}

/// Subjects sharing an upper-cased first letter.
#[derive(Debug, Clone, Serialize)]
pub struct LetterGroup<T> {
    pub letter: String,
    pub subjects: Vec<T>,
}

/// Unverified answers of one subject.
#[derive(Debug, Clone, Serialize)]
pub struct PendingAnswers {
    pub subject_id: u64,
    pub name: String,
    pub answers: Vec<QaRecord>,
}

fn is_cyrillic_letter(c: char) -> bool {
    matches!(c, 'А'..='я' | 'Ё' | 'ё')
}

/// Case-insensitive sort key; `ё` sorts right after `е`.
fn collation_key(name: &str) -> Vec<u32> {
    name.chars()
        .flat_map(char::to_lowercase)
        .map(|c| match c {
            'ё' => ('е' as u32) * 2 + 1,
            c => (c as u32) * 2,
        })
        .collect()
}

fn by_name(a: &str, b: &str) -> std::cmp::Ordering {
    collation_key(a).cmp(&collation_key(b)).then_with(|| a.cmp(b))
}

fn first_letter(name: &str) -> String {
    name.chars()
        .next()
        .map(|c| c.to_uppercase().collect())
        .unwrap_or_default()
}

/// Group by first letter. Cyrillic groups come first, then the rest; both
/// blocks keep first-seen order.
pub fn group_by_letter<'a, I>(subjects: I) -> Vec<LetterGroup<&'a Subject>>
where
    I: IntoIterator<Item = &'a Subject>,
{
    let mut cyrillic: Vec<LetterGroup<&Subject>> = Vec::new();
    let mut other: Vec<LetterGroup<&Subject>> = Vec::new();

    for subject in subjects {
        let letter = first_letter(&subject.name);
        let block = if letter.chars().next().is_some_and(is_cyrillic_letter) {
            &mut cyrillic
        } else {
            &mut other
        };
        match block.iter().position(|g| g.letter == letter) {
            Some(i) => block[i].subjects.push(subject),
            None => block.push(LetterGroup {
                letter,
                subjects: vec![subject],
            }),
        }
    }

    cyrillic.extend(other);
    cyrillic
}

/// Keep subjects whose name contains `query` (case-insensitive); drop empty groups.
pub fn filter_groups<'a>(
    groups: Vec<LetterGroup<&'a Subject>>,
    query: &str,
) -> Vec<LetterGroup<&'a Subject>> {
    if query.trim().is_empty() {
        return groups;
    }
    let query = query.to_lowercase();
    groups
        .into_iter()
        .filter_map(|group| {
            let subjects: Vec<&Subject> = group
                .subjects
                .into_iter()
                .filter(|s| s.name.to_lowercase().contains(&query))
                .collect();
            (!subjects.is_empty()).then(|| LetterGroup {
                letter: group.letter,
                subjects,
            })
        })
        .collect()
}

/// All subjects, kept sorted by name.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Catalogue {
    subjects: Vec<Subject>,
}

impl Catalogue {
    pub fn new(subjects: Vec<Subject>) -> Self {
        let mut catalogue = Self { subjects };
        catalogue.sort();
        catalogue
    }

    fn sort(&mut self) {
        for subject in &mut self.subjects {
            subject.categories.sort_by(|a, b| by_name(&a.name, &b.name));
        }
        self.subjects.sort_by(|a, b| by_name(&a.name, &b.name));
    }

    pub fn subjects(&self) -> &[Subject] {
        &self.subjects
    }

    pub fn get(&self, id: u64) -> Result<&Subject> {
        self.subjects
            .iter()
            .find(|s| s.id == id)
            .ok_or(AppError::SubjectNotFound(id))
    }

    fn get_mut(&mut self, id: u64) -> Result<&mut Subject> {
        self.subjects
            .iter_mut()
            .find(|s| s.id == id)
            .ok_or(AppError::SubjectNotFound(id))
    }

    /// Get subject `id`, creating it as `name` when missing.
    pub fn get_or_insert(&mut self, id: u64, name: &str) -> &mut Subject {
        if let Some(pos) = self.subjects.iter().position(|s| s.id == id) {
            return &mut self.subjects[pos];
        }
        info!(id, subject = name, "creating subject");
        self.subjects.push(Subject::new(id, name));
        self.sort();
        let pos = self
            .subjects
            .iter()
            .position(|s| s.id == id)
            .unwrap_or(self.subjects.len() - 1);
        &mut self.subjects[pos]
    }

    /// Append a crowd-submitted, unverified answer.
    pub fn add_answer(&mut self, subject_id: u64, question: &str, answer: &str) -> Result<&QaRecord> {
        let record = QaRecord::submitted(question, answer)?;
        let subject = self.get_mut(subject_id)?;
        subject.answers.push(record);
        debug!(subject_id, count = subject.answers.len(), "answer added");
        Ok(&subject.answers[subject.answers.len() - 1])
    }

    /// Subjects with unverified answers, by name.
    pub fn unverified(&self) -> Vec<PendingAnswers> {
        self.subjects
            .iter()
            .filter_map(|s| {
                let answers: Vec<QaRecord> =
                    s.answers.iter().filter(|a| a.unverified).cloned().collect();
                (!answers.is_empty()).then(|| PendingAnswers {
                    subject_id: s.id,
                    name: s.name.clone(),
                    answers,
                })
            })
            .collect()
    }

    /// Mark every record with this exact pair verified. Returns how many changed.
    pub fn verify(&mut self, subject_id: u64, question: &str, answer: &str) -> Result<usize> {
        let subject = self.get_mut(subject_id)?;
        let mut found = 0;
        for record in subject.answers.iter_mut().filter(|r| r.same_pair(question, answer)) {
            record.unverified = false;
            found += 1;
        }
        if found == 0 {
            return Err(AppError::AnswerNotFound(subject_id));
        }
        info!(subject_id, found, "answer verified");
        Ok(found)
    }

    /// Remove every record with this exact pair. Returns how many were removed.
    pub fn delete(&mut self, subject_id: u64, question: &str, answer: &str) -> Result<usize> {
        let subject = self.get_mut(subject_id)?;
        let before = subject.answers.len();
        subject.answers.retain(|r| !r.same_pair(question, answer));
        let removed = before - subject.answers.len();
        if removed == 0 {
            return Err(AppError::AnswerNotFound(subject_id));
        }
        info!(subject_id, removed, "answer deleted");
        Ok(removed)
    }

    /// Load catalogue from JSON file.
    pub fn load(path: &Path) -> Result<Self> {
        let json = fs::read_to_string(path)?;
        let subjects: Vec<Subject> = serde_json::from_str(&json)?;
        info!(path = %path.display(), subjects = subjects.len(), "catalogue loaded");
        Ok(Self::new(subjects))
    }

    /// Load catalogue, or start empty when the file does not exist yet.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            Self::load(path)
        } else {
            info!(path = %path.display(), "no catalogue file, starting empty");
            Ok(Self::default())
        }
    }

    /// Save catalogue to JSON file. Writes a sibling temp file, then renames it over `path`.
    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let tmp = temp_path(path);
        fs::write(&tmp, json)?;
        if let Err(e) = fs::rename(&tmp, path) {
            fs::remove_file(&tmp).ok();
            return Err(e.into());
        }
        debug!(path = %path.display(), "catalogue saved");
        Ok(())
    }

    /// [`Catalogue::save`] on the tokio runtime.
    pub async fn save_async(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        let tmp = temp_path(path);
        tokio::fs::write(&tmp, json).await?;
        if let Err(e) = tokio::fs::rename(&tmp, path).await {
            tokio::fs::remove_file(&tmp).await.ok();
            return Err(e.into());
        }
        debug!(path = %path.display(), "catalogue saved");
        Ok(())
    }
}

fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(question: &str, answer: &str, unverified: bool) -> QaRecord {
        QaRecord {
            question: question.to_string(),
            answer: answer.to_string(),
            unverified,
            added_at: None,
        }
    }

    fn sample() -> Catalogue {
        let mut physics = Subject::new(2, "Физика");
        physics.answers = vec![
            record("F = ?", "ma", false),
            record("E = ?", "mc^2", true),
            record("E = ?", "mc^2", true),
        ];
        let mut algebra = Subject::new(1, "Алгебра");
        algebra.answers = vec![record("2+2", "4", false)];
        Catalogue::new(vec![
            physics,
            Subject::new(3, "Python"),
            algebra,
            Subject::new(4, "Английский"),
            Subject::new(5, "java"),
        ])
    }

    fn names<'a>(group: &LetterGroup<&'a Subject>) -> Vec<&'a str> {
        group.subjects.iter().map(|s| s.name.as_str()).collect()
    }

    #[test]
    fn catalogue_sorted_by_name() {
        let c = sample();
        let names: Vec<&str> = c.subjects().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["java", "Python", "Алгебра", "Английский", "Физика"]);
    }

    #[test]
    fn groups_cyrillic_first() {
        let c = sample();
        let groups = group_by_letter(c.subjects());
        let letters: Vec<&str> = groups.iter().map(|g| g.letter.as_str()).collect();
        assert_eq!(letters, vec!["А", "Ф", "J", "P"]);
        assert_eq!(names(&groups[0]), vec!["Алгебра", "Английский"]);
    }

    #[test]
    fn sorting_ignores_case_and_places_yo_after_ye() {
        let c = Catalogue::new(
            ["java", "Python", "алгебра", "Биология", "Ёж", "Еда", "Жук"]
                .iter()
                .enumerate()
                .map(|(i, name)| Subject::new(i as u64, name))
                .collect(),
        );
        let sorted: Vec<&str> = c.subjects().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(sorted, vec!["java", "Python", "алгебра", "Биология", "Еда", "Ёж", "Жук"]);

        let groups = group_by_letter(c.subjects());
        let letters: Vec<&str> = groups.iter().map(|g| g.letter.as_str()).collect();
        assert_eq!(letters, vec!["А", "Б", "Е", "Ё", "Ж", "J", "P"]);
    }

    #[test]
    fn filter_groups_drops_empty() {
        let c = sample();
        let groups = filter_groups(group_by_letter(c.subjects()), "АЛГ");
        assert_eq!(groups.len(), 1);
        assert_eq!(names(&groups[0]), vec!["Алгебра"]);

        let all = filter_groups(group_by_letter(c.subjects()), "  ");
        assert_eq!(all.len(), 4);
    }

    #[test]
    fn add_answer_is_unverified() {
        let mut c = sample();
        let added = c.add_answer(1, " 3+3 ", " 6 ").unwrap();
        assert!(added.unverified);
        assert_eq!(added.question, "3+3");
        assert_eq!(c.get(1).unwrap().questions_count(), 2);

        assert!(matches!(c.add_answer(99, "q", "a"), Err(AppError::SubjectNotFound(99))));
        assert!(matches!(c.add_answer(1, "", "a"), Err(AppError::EmptyField("question"))));
    }

    #[test]
    fn unverified_listing() {
        let c = sample();
        let pending = c.unverified();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].subject_id, 2);
        assert_eq!(pending[0].answers.len(), 2);
    }

    #[test]
    fn verify_marks_all_duplicates() {
        let mut c = sample();
        assert_eq!(c.verify(2, "E = ?", "mc^2").unwrap(), 2);
        assert!(c.unverified().is_empty());
        assert!(matches!(c.verify(2, "E = ?", "nope"), Err(AppError::AnswerNotFound(2))));
    }

    #[test]
    fn delete_removes_pair() {
        let mut c = sample();
        assert_eq!(c.delete(2, "E = ?", "mc^2").unwrap(), 2);
        assert_eq!(c.get(2).unwrap().questions_count(), 1);
        assert!(matches!(c.delete(2, "E = ?", "mc^2"), Err(AppError::AnswerNotFound(2))));
    }

    #[test]
    fn get_or_insert_creates_once() {
        let mut c = sample();
        c.get_or_insert(10, "Биология").answers.push(record("q", "a", false));
        c.get_or_insert(10, "ignored").answers.push(record("q2", "a2", false));
        assert_eq!(c.get(10).unwrap().name, "Биология");
        assert_eq!(c.get(10).unwrap().questions_count(), 2);
        assert_eq!(c.subjects().len(), 6);
    }

    #[test]
    fn save_and_load() {
        let path = std::env::temp_dir().join(format!("poly-saboteur-{}.json", std::process::id()));
        let c = sample();
        c.save(&path).unwrap();
        let loaded = Catalogue::load(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded.subjects().len(), 5);
        assert_eq!(loaded.get(2).unwrap().answers, c.get(2).unwrap().answers);
    }

    #[test]
    fn failed_save_leaves_no_temp_file() {
        let dir = std::env::temp_dir().join(format!("poly-saboteur-dir-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        // Renaming a file over a directory fails.
        let err = sample().save(&dir);
        let tmp = temp_path(&dir);
        let tmp_exists = tmp.exists();
        std::fs::remove_dir(&dir).ok();
        assert!(matches!(err, Err(AppError::Io(_))));
        assert!(!tmp_exists);
    }

    #[tokio::test]
    async fn save_async_round_trips() {
        let path = std::env::temp_dir().join(format!("poly-saboteur-async-{}.json", std::process::id()));
        sample().save_async(&path).await.unwrap();
        let loaded = Catalogue::load(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded.subjects().len(), 5);
    }

    #[test]
    fn load_or_default_missing_file() {
        let path = std::env::temp_dir().join("poly-saboteur-does-not-exist.json");
        assert!(Catalogue::load_or_default(&path).unwrap().subjects().is_empty());
    }
}
