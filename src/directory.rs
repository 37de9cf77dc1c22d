use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::errors::{FeesError, Result};
use crate::types::{GradeId, MethodId, MethodKind, Role, ScholarType, StudentId, UserId};

/// student record as consumed from the students module
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Student {
    pub id: StudentId,
    pub admission_number: String,
    pub full_name: String,
    pub grade: GradeId,
    pub class_room: Option<String>,
    pub scholar_type: ScholarType,
}

impl Student {
    pub fn new(
        admission_number: impl Into<String>,
        full_name: impl Into<String>,
        grade: GradeId,
        scholar_type: ScholarType,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            admission_number: admission_number.into(),
            full_name: full_name.into(),
            grade,
            class_room: None,
            scholar_type,
        }
    }
}

/// user account as consumed from the accounts module
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub full_name: String,
    pub role: Role,
}

impl User {
    pub fn new(username: impl Into<String>, full_name: impl Into<String>, role: Role) -> Self {
        Self {
            id: Uuid::new_v4(),
            username: username.into(),
            full_name: full_name.into(),
            role,
        }
    }
}

/// an accepted way of paying fees
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentMethod {
    pub id: MethodId,
    pub kind: MethodKind,
    pub description: String,
    pub is_active: bool,
    pub requires_reference: bool,
}

impl PaymentMethod {
    pub fn new(kind: MethodKind, requires_reference: bool) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            description: kind.to_string(),
            is_active: true,
            requires_reference,
        }
    }
}

/// registry of the foreign entities payment recording validates against
#[derive(Debug, Default)]
pub struct Directory {
    students: HashMap<StudentId, Student>,
    users: HashMap<UserId, User>,
    methods: HashMap<MethodId, PaymentMethod>,
}

impl Directory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_student(&mut self, student: Student) -> StudentId {
        let id = student.id;
        self.students.insert(id, student);
        id
    }

    pub fn add_user(&mut self, user: User) -> UserId {
        let id = user.id;
        self.users.insert(id, user);
        id
    }

    pub fn add_method(&mut self, method: PaymentMethod) -> MethodId {
        let id = method.id;
        self.methods.insert(id, method);
        id
    }

    pub fn student(&self, id: StudentId) -> Result<&Student> {
        self.students
            .get(&id)
            .ok_or(FeesError::StudentNotFound { id })
    }

    pub fn user(&self, id: UserId) -> Result<&User> {
        self.users.get(&id).ok_or(FeesError::UserNotFound { id })
    }

    pub fn method(&self, id: MethodId) -> Result<&PaymentMethod> {
        self.methods
            .get(&id)
            .ok_or(FeesError::PaymentMethodNotFound { id })
    }

    /// resolve a method and check it can currently take payments
    pub fn active_method(&self, id: MethodId) -> Result<&PaymentMethod> {
        let method = self.method(id)?;
        if !method.is_active {
            return Err(FeesError::InactivePaymentMethod);
        }
        Ok(method)
    }

    pub fn deactivate_method(&mut self, id: MethodId) -> Result<()> {
        let method = self
            .methods
            .get_mut(&id)
            .ok_or(FeesError::PaymentMethodNotFound { id })?;
        method.is_active = false;
        Ok(())
    }

    pub fn students(&self) -> impl Iterator<Item = &Student> {
        self.students.values()
    }
}
