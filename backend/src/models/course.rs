//! Course content models. Course/category CRUD lives elsewhere; these types
//! exist so the media authorizer can walk a course's module tree.

use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Course {
    pub id: String,
    pub title: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CourseModule {
    pub id: String,
    pub course_id: String,
    pub title: String,
    pub position: i32,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Lesson {
    pub id: String,
    pub module_id: String,
    pub title: String,
    /// Full delivery URL at the video provider, if the lesson has video.
    pub video_url: Option<String>,
    /// Waives enrollment-based access control when set.
    pub is_free_preview: bool,
    pub position: i32,
}

/// A course joined with its modules and their lessons, as loaded for
/// authorization decisions.
#[derive(Debug, Clone)]
pub struct CourseContent {
    pub course: Course,
    pub modules: Vec<ModuleContent>,
}

#[derive(Debug, Clone)]
pub struct ModuleContent {
    pub module: CourseModule,
    pub lessons: Vec<Lesson>,
}

impl CourseContent {
    /// Locates a lesson by id anywhere in the course's module tree.
    pub fn find_lesson(&self, lesson_id: &str) -> Option<&Lesson> {
        self.modules
            .iter()
            .flat_map(|m| m.lessons.iter())
            .find(|lesson| lesson.id == lesson_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lesson(id: &str, module_id: &str) -> Lesson {
        Lesson {
            id: id.to_string(),
            module_id: module_id.to_string(),
            title: format!("Lesson {}", id),
            video_url: None,
            is_free_preview: false,
            position: 0,
        }
    }

    #[test]
    fn find_lesson_searches_every_module() {
        let content = CourseContent {
            course: Course {
                id: "c1".into(),
                title: "Course".into(),
            },
            modules: vec![
                ModuleContent {
                    module: CourseModule {
                        id: "m1".into(),
                        course_id: "c1".into(),
                        title: "Intro".into(),
                        position: 0,
                    },
                    lessons: vec![lesson("l1", "m1")],
                },
                ModuleContent {
                    module: CourseModule {
                        id: "m2".into(),
                        course_id: "c1".into(),
                        title: "Advanced".into(),
                        position: 1,
                    },
                    lessons: vec![lesson("l2", "m2"), lesson("l3", "m2")],
                },
            ],
        };

        assert_eq!(content.find_lesson("l3").map(|l| l.id.as_str()), Some("l3"));
        assert!(content.find_lesson("l9").is_none());
    }
}
