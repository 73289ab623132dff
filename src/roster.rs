//! Classes and students, handed to the engine explicitly.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Student {
    pub id: String,
    pub name: String,
}

impl Student {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
        }
    }
}

/// One class and its students, in roster order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClassRoster {
    pub id: String,
    pub name: String,
    pub students: Vec<Student>,
}

impl ClassRoster {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            students: Vec::new(),
        }
    }

    pub fn with_students(mut self, students: Vec<Student>) -> Self {
        self.students = students;
        self
    }

    /// Human-readable label, e.g. `Grade 7 Blue (7B)`.
    pub fn label(&self) -> String {
        if self.name.is_empty() || self.name == self.id {
            self.id.clone()
        } else {
            format!("{} ({})", self.name, self.id)
        }
    }
}

/// Every class in the school, in a stable order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SchoolRoster {
    pub classes: Vec<ClassRoster>,
}

impl SchoolRoster {
    pub fn new(classes: Vec<ClassRoster>) -> Self {
        Self { classes }
    }

    pub fn class(&self, class_id: &str) -> Option<&ClassRoster> {
        self.classes.iter().find(|c| c.id == class_id)
    }

    /// Locate a student together with the class they belong to.
    pub fn find_student(&self, student_id: &str) -> Option<(&ClassRoster, &Student)> {
        self.classes.iter().find_map(|class| {
            class
                .students
                .iter()
                .find(|s| s.id == student_id)
                .map(|s| (class, s))
        })
    }

    /// Append a student, creating the class on first sight.
    pub fn enroll(&mut self, class_id: &str, class_name: &str, student: Student) {
        match self.classes.iter_mut().find(|c| c.id == class_id) {
            Some(class) => class.students.push(student),
            None => self
                .classes
                .push(ClassRoster::new(class_id, class_name).with_students(vec![student])),
        }
    }

    pub fn student_count(&self) -> usize {
        self.classes.iter().map(|c| c.students.len()).sum()
    }
}
