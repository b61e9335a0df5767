//! GraphQL object and input types

use async_graphql::{InputObject, SimpleObject, ID};

use crate::domain;

#[derive(SimpleObject, Debug, Clone)]
pub struct User {
    pub id: ID,
    pub name: String,
}

impl From<domain::User> for User {
    fn from(user: domain::User) -> Self {
        Self {
            id: ID(user.id),
            name: user.name,
        }
    }
}

#[derive(SimpleObject, Debug, Clone)]
pub struct Author {
    pub id: ID,
    pub name: String,
}

impl From<domain::Author> for Author {
    fn from(author: domain::Author) -> Self {
        Self {
            id: ID(author.id),
            name: author.name,
        }
    }
}

#[derive(SimpleObject, Debug, Clone)]
pub struct Book {
    pub id: ID,
    pub title: String,
    pub author: Author,
}

#[derive(InputObject, Debug)]
pub struct NewUser {
    pub name: String,
}

#[derive(InputObject, Debug)]
pub struct NewBook {
    pub title: String,
    pub author_id: ID,
}

#[derive(InputObject, Debug)]
pub struct NewAuthor {
    pub name: String,
}
