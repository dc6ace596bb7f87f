/// Complete database schema for the forum.
///
/// Uses CREATE TABLE/INDEX IF NOT EXISTS for idempotent execution.
/// Denormalized counters carry CHECK constraints so a write that would drive
/// one negative fails and aborts its transaction.
pub const INITIAL_SCHEMA: &str = r#"
-- Users: identity records
CREATE TABLE IF NOT EXISTS users (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL,
    username TEXT NOT NULL UNIQUE COLLATE NOCASE,
    email TEXT NOT NULL UNIQUE COLLATE NOCASE,
    image TEXT,
    created_at INTEGER NOT NULL
);

-- Accounts: identity provider links, unique per provider account
CREATE TABLE IF NOT EXISTS accounts (
    id INTEGER PRIMARY KEY,
    user_id INTEGER NOT NULL,
    name TEXT NOT NULL,
    image TEXT,
    provider TEXT NOT NULL CHECK (provider IN ('github', 'google', 'credentials')),
    provider_account_id TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    UNIQUE (provider, provider_account_id),
    FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
);

-- Questions with denormalized answer/view/vote counters
CREATE TABLE IF NOT EXISTS questions (
    id INTEGER PRIMARY KEY,
    title TEXT NOT NULL,
    content TEXT NOT NULL,
    author_id INTEGER NOT NULL,
    answers INTEGER NOT NULL DEFAULT 0 CHECK (answers >= 0),
    views INTEGER NOT NULL DEFAULT 0 CHECK (views >= 0),
    upvotes INTEGER NOT NULL DEFAULT 0 CHECK (upvotes >= 0),
    downvotes INTEGER NOT NULL DEFAULT 0 CHECK (downvotes >= 0),
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    FOREIGN KEY (author_id) REFERENCES users(id)
);

-- Answers with denormalized vote counters
CREATE TABLE IF NOT EXISTS answers (
    id INTEGER PRIMARY KEY,
    author_id INTEGER NOT NULL,
    question_id INTEGER NOT NULL,
    content TEXT NOT NULL,
    upvotes INTEGER NOT NULL DEFAULT 0 CHECK (upvotes >= 0),
    downvotes INTEGER NOT NULL DEFAULT 0 CHECK (downvotes >= 0),
    created_at INTEGER NOT NULL,
    FOREIGN KEY (author_id) REFERENCES users(id),
    FOREIGN KEY (question_id) REFERENCES questions(id) ON DELETE CASCADE
);

-- Tags: display name plus its case-folded key, unique per key,
-- with a linked-question counter
CREATE TABLE IF NOT EXISTS tags (
    id INTEGER PRIMARY KEY,
    name TEXT NOT NULL COLLATE NOCASE,
    name_key TEXT NOT NULL UNIQUE,
    questions INTEGER NOT NULL DEFAULT 0 CHECK (questions >= 0),
    created_at INTEGER NOT NULL
);

-- Junction table: links tags to questions (many-to-many)
-- Row order per question is the question's tag order.
CREATE TABLE IF NOT EXISTS tag_questions (
    id INTEGER PRIMARY KEY,
    tag_id INTEGER NOT NULL,
    question_id INTEGER NOT NULL,
    created_at INTEGER NOT NULL,
    UNIQUE (tag_id, question_id),
    FOREIGN KEY (tag_id) REFERENCES tags(id) ON DELETE CASCADE,
    FOREIGN KEY (question_id) REFERENCES questions(id) ON DELETE CASCADE
);

-- Votes: at most one per (author, target)
CREATE TABLE IF NOT EXISTS votes (
    id INTEGER PRIMARY KEY,
    author_id INTEGER NOT NULL,
    target_type TEXT NOT NULL CHECK (target_type IN ('question', 'answer')),
    target_id INTEGER NOT NULL,
    vote_type TEXT NOT NULL CHECK (vote_type IN ('upvotes', 'downvotes')),
    created_at INTEGER NOT NULL,
    updated_at INTEGER NOT NULL,
    UNIQUE (author_id, target_type, target_id),
    FOREIGN KEY (author_id) REFERENCES users(id) ON DELETE CASCADE
);

-- Index for sorting questions by creation date
CREATE INDEX IF NOT EXISTS idx_questions_created ON questions(created_at);
CREATE INDEX IF NOT EXISTS idx_questions_author ON questions(author_id);

CREATE INDEX IF NOT EXISTS idx_answers_question ON answers(question_id);

-- Indexes for efficient junction table lookups
CREATE INDEX IF NOT EXISTS idx_tag_questions_question ON tag_questions(question_id);
CREATE INDEX IF NOT EXISTS idx_tag_questions_tag ON tag_questions(tag_id);

CREATE INDEX IF NOT EXISTS idx_votes_target ON votes(target_type, target_id);
CREATE INDEX IF NOT EXISTS idx_accounts_user ON accounts(user_id);
"#;
