// src/services/prompt.rs
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Model,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn model(content: impl Into<String>) -> Self {
        Self { role: Role::Model, content: content.into() }
    }
}

pub const SYSTEM_PROMPT: &str = "\
You are the AI Dive Advisor for AquaSense, a premier diving center.
Your goal is to be helpful, friendly, and professional.

Here is the information about AquaSense:
- Location: 123 Ocean Drive, Atlantis, Ocean City 90210.
- Contact: +1 (123) 456-7890, info@divingexcursions.com.
- Mission: To share the passion of diving through safe, fun, and unforgettable experiences.
- Founded: 2010.

Courses & Prices:
1. Open Water Diver: $350 (Beginner's access)
2. Advanced Diving Skills: $450 (Enhance skills)
3. Coral Reef Exploration: $200 (Marine life)
4. Wreck Diving: $500 (Shipwreck adventures)

If the user asks for a recommendation, ask them about their experience level and interests.
Keep responses concise (under 100 words) unless detailed info is requested.";

pub const ACKNOWLEDGMENT: &str = "Understood. I am ready to assist AquaSense customers.";

/// The two turns sent ahead of every user message. Built fresh per request.
pub fn seed_history() -> Vec<Turn> {
    vec![Turn::user(SYSTEM_PROMPT), Turn::model(ACKNOWLEDGMENT)]
}
