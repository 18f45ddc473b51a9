//! Process-local backend.
//!
//! Keeps the whole dataset behind one `tokio::sync::RwLock`. Every write takes
//! the write lock once, checks everything it needs, then applies its changes,
//! so the all-or-nothing and no-oversell guarantees of the `PostgreSQL`
//! backend hold here too. Constraints the schema enforces (unique keys,
//! restricted deletes, foreign keys) are checked by hand.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use bookshop_core::catalog::{BookSortField, OrderSortField, Sort, UserSortField};
use bookshop_core::{
    AddressId, AuthorId, BookId, CommentId, OrderId, OrderedBookId, PublisherId, Rating,
    StatusTransition, UserId,
};

use super::{
    AuthorRepository, Backend, BookRepository, CommentRepository, OrderRepository,
    PublisherRepository, RepoResult, RepositoryError, UserRepository,
};
use crate::models::{
    Author, AuthorInput, Book, BookFilter, BookSummary, Comment, DeliveryAddress, NewComment,
    NewOrder, NewUser, Order, OrderDetail, OrderScope, OrderedBook, Publisher, PublisherInput,
    User,
};

/// Stored account with its hash.
#[derive(Debug, Clone)]
struct UserRecord {
    user: User,
    password_hash: String,
}

/// Stored line item; title and image are resolved at read time.
#[derive(Debug, Clone)]
struct LineRecord {
    id: OrderedBookId,
    book_id: BookId,
    quantity: i32,
    price: rust_decimal::Decimal,
}

#[derive(Debug, Clone)]
struct OrderRecord {
    order: Order,
    address: DeliveryAddress,
    lines: Vec<LineRecord>,
}

/// Stored review; the author's username is resolved at read time.
#[derive(Debug, Clone)]
struct CommentRecord {
    id: CommentId,
    book_id: BookId,
    author_id: UserId,
    rating: Option<Rating>,
    comment: String,
    created_at: DateTime<Utc>,
}

#[derive(Debug, Default)]
struct Dataset {
    next_id: i32,
    users: BTreeMap<UserId, UserRecord>,
    authors: BTreeMap<AuthorId, Author>,
    publishers: BTreeMap<PublisherId, Publisher>,
    books: BTreeMap<BookId, Book>,
    orders: BTreeMap<OrderId, OrderRecord>,
    comments: BTreeMap<CommentId, CommentRecord>,
}

impl Dataset {
    /// One sequence shared by every table; ids only need to be unique per table.
    fn next_id(&mut self) -> i32 {
        self.next_id += 1;
        self.next_id
    }

    fn comment(&self, record: &CommentRecord) -> Comment {
        Comment {
            id: record.id,
            book_id: record.book_id,
            author_id: record.author_id,
            author_username: self
                .users
                .get(&record.author_id)
                .map(|r| r.user.username.clone())
                .unwrap_or_default(),
            rating: record.rating,
            comment: record.comment.clone(),
            created_at: record.created_at,
        }
    }

    fn summary(&self, book: &Book) -> BookSummary {
        let ratings: Vec<&CommentRecord> = self
            .comments
            .values()
            .filter(|c| c.book_id == book.id)
            .collect();
        BookSummary {
            id: book.id,
            title: book.title.clone(),
            image: book.image.clone(),
            price: book.price,
            count_in_stock: book.count_in_stock,
            rating: Rating::average(ratings.iter().filter_map(|c| c.rating)),
            reviews: i64::try_from(ratings.len()).unwrap_or(i64::MAX),
        }
    }

    fn detail(&self, record: &OrderRecord) -> OrderDetail {
        let items = record
            .lines
            .iter()
            .map(|line| {
                let book = self.books.get(&line.book_id);
                OrderedBook {
                    id: line.id,
                    book_id: line.book_id,
                    title: book.map(|b| b.title.clone()).unwrap_or_default(),
                    image: book.and_then(|b| b.image.clone()),
                    quantity: line.quantity,
                    price: line.price,
                }
            })
            .collect();
        OrderDetail {
            order: record.order.clone(),
            delivery_address: Some(record.address.clone()),
            items,
        }
    }

    fn check_book_refs(&self, book: &Book) -> RepoResult<()> {
        if let Some(author) = book.author_id
            && !self.authors.contains_key(&author)
        {
            return Err(RepositoryError::InvalidReference(format!("author {author}")));
        }
        if let Some(publisher) = book.publisher_id
            && !self.publishers.contains_key(&publisher)
        {
            return Err(RepositoryError::InvalidReference(format!(
                "publisher {publisher}"
            )));
        }
        Ok(())
    }

    fn book_is_referenced(&self, id: BookId) -> bool {
        self.comments.values().any(|c| c.book_id == id)
            || self
                .orders
                .values()
                .any(|o| o.lines.iter().any(|l| l.book_id == id))
    }
}

/// In-memory store with the same contract as the `PostgreSQL` one.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: RwLock<Dataset>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

/// Case-insensitive substring match.
fn contains(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.to_lowercase())
}

/// Case-insensitive match against any of the comma-separated values.
fn any_of(value: &str, csv: &str) -> bool {
    let value = value.to_lowercase();
    let mut candidates = csv
        .split(',')
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
        .peekable();
    candidates.peek().is_none() || candidates.any(|c| c == value)
}

#[async_trait]
impl UserRepository for MemoryStore {
    async fn create_user(&self, user: NewUser) -> RepoResult<User> {
        let mut data = self.data.write().await;
        if data.users.values().any(|r| r.user.username == user.username) {
            return Err(RepositoryError::Conflict("username already exists".to_owned()));
        }
        let id = UserId::new(data.next_id());
        let record = UserRecord {
            user: User {
                id,
                username: user.username,
                first_name: user.first_name,
                last_name: user.last_name,
                email: user.email,
                is_staff: user.is_staff,
                date_joined: Utc::now(),
            },
            password_hash: user.password_hash,
        };
        let created = record.user.clone();
        data.users.insert(id, record);
        Ok(created)
    }

    async fn get_user(&self, id: UserId) -> RepoResult<Option<User>> {
        let data = self.data.read().await;
        Ok(data.users.get(&id).map(|r| r.user.clone()))
    }

    async fn get_user_credentials(&self, username: &str) -> RepoResult<Option<(User, String)>> {
        let data = self.data.read().await;
        Ok(data
            .users
            .values()
            .find(|r| r.user.username == username)
            .map(|r| (r.user.clone(), r.password_hash.clone())))
    }

    async fn list_users(&self, sort: Sort<UserSortField>) -> RepoResult<Vec<User>> {
        let data = self.data.read().await;
        let mut users: Vec<User> = data.users.values().map(|r| r.user.clone()).collect();
        users.sort_by(|a, b| {
            let ordering = match sort.field {
                UserSortField::Username => a.username.cmp(&b.username),
                UserSortField::LastName => a.last_name.cmp(&b.last_name),
            };
            let ordering = if sort.descending {
                ordering.reverse()
            } else {
                ordering
            };
            ordering.then(a.id.cmp(&b.id))
        });
        Ok(users)
    }

    async fn update_user(&self, user: &User) -> RepoResult<User> {
        let mut data = self.data.write().await;
        let record = data.users.get_mut(&user.id).ok_or(RepositoryError::NotFound)?;
        record.user.first_name.clone_from(&user.first_name);
        record.user.last_name.clone_from(&user.last_name);
        record.user.email = user.email.clone();
        Ok(record.user.clone())
    }

    async fn delete_user(&self, id: UserId) -> RepoResult<()> {
        let mut data = self.data.write().await;
        if data.users.remove(&id).is_none() {
            return Err(RepositoryError::NotFound);
        }
        data.orders.retain(|_, o| o.order.customer_id != id);
        data.comments.retain(|_, c| c.author_id != id);
        Ok(())
    }
}

#[async_trait]
impl AuthorRepository for MemoryStore {
    async fn list_authors(&self, search: Option<&str>) -> RepoResult<Vec<Author>> {
        let data = self.data.read().await;
        let mut authors: Vec<Author> = data
            .authors
            .values()
            .filter(|a| search.is_none_or(|s| contains(&a.name, s) || contains(&a.surname, s)))
            .cloned()
            .collect();
        authors.sort_by(|a, b| a.surname.cmp(&b.surname).then(a.id.cmp(&b.id)));
        Ok(authors)
    }

    async fn get_author(&self, id: AuthorId) -> RepoResult<Option<Author>> {
        Ok(self.data.read().await.authors.get(&id).cloned())
    }

    async fn create_author(&self, input: &AuthorInput) -> RepoResult<Author> {
        let mut data = self.data.write().await;
        let author = Author {
            id: AuthorId::new(data.next_id()),
            name: input.name.clone(),
            surname: input.surname.clone(),
        };
        data.authors.insert(author.id, author.clone());
        Ok(author)
    }

    async fn update_author(&self, id: AuthorId, input: &AuthorInput) -> RepoResult<Author> {
        let mut data = self.data.write().await;
        let author = data.authors.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        author.name.clone_from(&input.name);
        author.surname.clone_from(&input.surname);
        Ok(author.clone())
    }

    async fn delete_author(&self, id: AuthorId) -> RepoResult<()> {
        let mut data = self.data.write().await;
        if !data.authors.contains_key(&id) {
            return Err(RepositoryError::NotFound);
        }
        if data.books.values().any(|b| b.author_id == Some(id)) {
            return Err(RepositoryError::Conflict("author still has books".to_owned()));
        }
        data.authors.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl PublisherRepository for MemoryStore {
    async fn list_publishers(&self, search: Option<&str>) -> RepoResult<Vec<Publisher>> {
        let data = self.data.read().await;
        let mut publishers: Vec<Publisher> = data
            .publishers
            .values()
            .filter(|p| search.is_none_or(|s| contains(&p.name, s)))
            .cloned()
            .collect();
        publishers.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        Ok(publishers)
    }

    async fn get_publisher(&self, id: PublisherId) -> RepoResult<Option<Publisher>> {
        Ok(self.data.read().await.publishers.get(&id).cloned())
    }

    async fn create_publisher(&self, input: &PublisherInput) -> RepoResult<Publisher> {
        let mut data = self.data.write().await;
        let publisher = Publisher {
            id: PublisherId::new(data.next_id()),
            name: input.name.clone(),
        };
        data.publishers.insert(publisher.id, publisher.clone());
        Ok(publisher)
    }

    async fn update_publisher(
        &self,
        id: PublisherId,
        input: &PublisherInput,
    ) -> RepoResult<Publisher> {
        let mut data = self.data.write().await;
        let publisher = data.publishers.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        publisher.name.clone_from(&input.name);
        Ok(publisher.clone())
    }

    async fn delete_publisher(&self, id: PublisherId) -> RepoResult<()> {
        let mut data = self.data.write().await;
        if !data.publishers.contains_key(&id) {
            return Err(RepositoryError::NotFound);
        }
        if data.books.values().any(|b| b.publisher_id == Some(id)) {
            return Err(RepositoryError::Conflict(
                "publisher still has books".to_owned(),
            ));
        }
        data.publishers.remove(&id);
        Ok(())
    }
}

#[async_trait]
impl BookRepository for MemoryStore {
    async fn list_books(&self, filter: &BookFilter) -> RepoResult<Vec<BookSummary>> {
        let data = self.data.read().await;
        let author_of = |book: &Book| book.author_id.and_then(|id| data.authors.get(&id));
        let publisher_of = |book: &Book| book.publisher_id.and_then(|id| data.publishers.get(&id));

        let mut books: Vec<&Book> = data
            .books
            .values()
            .filter(|b| filter.include_out_of_stock || b.in_stock())
            .filter(|b| {
                filter.search.as_deref().is_none_or(|s| {
                    contains(&b.title, s)
                        || author_of(b).is_some_and(|a| contains(&a.surname, s))
                        || publisher_of(b).is_some_and(|p| contains(&p.name, s))
                })
            })
            .filter(|b| filter.title.as_deref().is_none_or(|t| any_of(&b.title, t)))
            .filter(|b| {
                filter.author.as_deref().is_none_or(|csv| {
                    author_of(b).is_some_and(|a| any_of(&a.name, csv) || any_of(&a.surname, csv))
                })
            })
            .filter(|b| {
                filter
                    .publisher
                    .as_deref()
                    .is_none_or(|csv| publisher_of(b).is_some_and(|p| any_of(&p.name, csv)))
            })
            .filter(|b| filter.author_id.is_none_or(|id| b.author_id == Some(id)))
            .filter(|b| filter.publisher_id.is_none_or(|id| b.publisher_id == Some(id)))
            .filter(|b| filter.min_price.is_none_or(|min| b.price >= min))
            .filter(|b| filter.max_price.is_none_or(|max| b.price <= max))
            .filter(|b| filter.min_year.is_none_or(|min| b.publication_year >= min))
            .filter(|b| filter.max_year.is_none_or(|max| b.publication_year <= max))
            .collect();

        books.sort_by(|a, b| {
            let ordering = match filter.sort.field {
                BookSortField::Title => a.title.cmp(&b.title),
                BookSortField::Price => a.price.cmp(&b.price),
                BookSortField::PublicationYear => a.publication_year.cmp(&b.publication_year),
            };
            let ordering = if filter.sort.descending {
                ordering.reverse()
            } else {
                ordering
            };
            ordering.then(a.id.cmp(&b.id))
        });

        Ok(books.into_iter().map(|b| data.summary(b)).collect())
    }

    async fn get_book(&self, id: BookId) -> RepoResult<Option<Book>> {
        Ok(self.data.read().await.books.get(&id).cloned())
    }

    async fn create_book(&self, book: &Book) -> RepoResult<Book> {
        let mut data = self.data.write().await;
        data.check_book_refs(book)?;
        let created = Book {
            id: BookId::new(data.next_id()),
            ..book.clone()
        };
        data.books.insert(created.id, created.clone());
        Ok(created)
    }

    async fn update_book(&self, book: &Book) -> RepoResult<Book> {
        let mut data = self.data.write().await;
        if !data.books.contains_key(&book.id) {
            return Err(RepositoryError::NotFound);
        }
        data.check_book_refs(book)?;
        data.books.insert(book.id, book.clone());
        Ok(book.clone())
    }

    async fn delete_book(&self, id: BookId) -> RepoResult<()> {
        let mut data = self.data.write().await;
        if !data.books.contains_key(&id) {
            return Err(RepositoryError::NotFound);
        }
        if data.book_is_referenced(id) {
            return Err(RepositoryError::Conflict(
                "book is referenced by orders or reviews".to_owned(),
            ));
        }
        data.books.remove(&id);
        Ok(())
    }

    async fn set_book_image(&self, id: BookId, image: &str) -> RepoResult<Book> {
        let mut data = self.data.write().await;
        let book = data.books.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        book.image = Some(image.to_owned());
        Ok(book.clone())
    }
}

#[async_trait]
impl CommentRepository for MemoryStore {
    async fn list_comments(&self, book_id: BookId) -> RepoResult<Vec<Comment>> {
        let data = self.data.read().await;
        let mut comments: Vec<Comment> = data
            .comments
            .values()
            .filter(|c| c.book_id == book_id)
            .map(|c| data.comment(c))
            .collect();
        comments.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(comments)
    }

    async fn get_comment(&self, id: CommentId) -> RepoResult<Option<Comment>> {
        let data = self.data.read().await;
        Ok(data.comments.get(&id).map(|c| data.comment(c)))
    }

    async fn create_comment(&self, comment: NewComment) -> RepoResult<Comment> {
        let mut data = self.data.write().await;
        if !data.books.contains_key(&comment.book_id) {
            return Err(RepositoryError::InvalidReference(format!(
                "book {}",
                comment.book_id
            )));
        }
        if data
            .comments
            .values()
            .any(|c| c.book_id == comment.book_id && c.author_id == comment.author_id)
        {
            return Err(RepositoryError::Conflict(
                "you have already reviewed this book".to_owned(),
            ));
        }
        let record = CommentRecord {
            id: CommentId::new(data.next_id()),
            book_id: comment.book_id,
            author_id: comment.author_id,
            rating: comment.rating,
            comment: comment.comment,
            created_at: Utc::now(),
        };
        let created = data.comment(&record);
        data.comments.insert(record.id, record);
        Ok(created)
    }

    async fn update_comment(&self, comment: &Comment) -> RepoResult<Comment> {
        let mut data = self.data.write().await;
        let record = data
            .comments
            .get_mut(&comment.id)
            .ok_or(RepositoryError::NotFound)?;
        record.rating = comment.rating;
        record.comment.clone_from(&comment.comment);
        let record = record.clone();
        Ok(data.comment(&record))
    }

    async fn delete_comment(&self, id: CommentId) -> RepoResult<()> {
        let mut data = self.data.write().await;
        data.comments
            .remove(&id)
            .map(|_| ())
            .ok_or(RepositoryError::NotFound)
    }
}

#[async_trait]
impl OrderRepository for MemoryStore {
    async fn place_order(&self, order: NewOrder) -> RepoResult<OrderDetail> {
        let mut data = self.data.write().await;

        // Check every line against the stock left after the lines before it,
        // so two lines for the same book are judged together.
        let mut remaining: BTreeMap<BookId, i32> = BTreeMap::new();
        for line in &order.lines {
            let book = data.books.get(&line.book_id).ok_or_else(|| {
                RepositoryError::InvalidReference(format!("book {}", line.book_id))
            })?;
            let left = remaining.entry(line.book_id).or_insert(book.count_in_stock);
            if *left < line.quantity {
                return Err(RepositoryError::InsufficientStock(line.book_id));
            }
            *left -= line.quantity;
        }

        for (book_id, left) in remaining {
            if let Some(book) = data.books.get_mut(&book_id) {
                book.count_in_stock = left;
            }
        }

        let order_id = OrderId::new(data.next_id());
        let address = DeliveryAddress {
            id: AddressId::new(data.next_id()),
            address: order.address,
            phone_number: order.phone_number,
        };
        let lines = order
            .lines
            .iter()
            .map(|line| LineRecord {
                id: OrderedBookId::new(data.next_id()),
                book_id: line.book_id,
                quantity: line.quantity,
                price: line.unit_price,
            })
            .collect();
        let record = OrderRecord {
            order: Order {
                id: order_id,
                customer_id: order.customer_id,
                created_at: Utc::now(),
                status: bookshop_core::OrderStatus::default(),
                is_paid: false,
                paid_at: None,
                delivered_at: None,
                shipping_cost: order.shipping_cost,
                total_cost: order.total_cost,
                payment_method: order.payment_method,
            },
            address,
            lines,
        };
        let detail = data.detail(&record);
        data.orders.insert(order_id, record);
        Ok(detail)
    }

    async fn get_order(&self, id: OrderId) -> RepoResult<Option<OrderDetail>> {
        let data = self.data.read().await;
        Ok(data.orders.get(&id).map(|r| data.detail(r)))
    }

    async fn list_orders(&self, scope: OrderScope) -> RepoResult<Vec<Order>> {
        let data = self.data.read().await;
        let mut orders: Vec<Order> = data
            .orders
            .values()
            .filter(|r| scope.customer_id.is_none_or(|c| r.order.customer_id == c))
            .map(|r| r.order.clone())
            .collect();
        orders.sort_by(|a, b| {
            let ordering = match scope.sort.field {
                OrderSortField::CreatedAt => a.created_at.cmp(&b.created_at),
                OrderSortField::IsPaid => a.is_paid.cmp(&b.is_paid),
                OrderSortField::Status => a.status.rank().cmp(&b.status.rank()),
                OrderSortField::TotalCost => a.total_cost.cmp(&b.total_cost),
            }
            .then(a.id.cmp(&b.id));
            if scope.sort.descending {
                ordering.reverse()
            } else {
                ordering
            }
        });
        Ok(orders)
    }

    async fn mark_order_paid(&self, id: OrderId, at: DateTime<Utc>) -> RepoResult<Order> {
        let mut data = self.data.write().await;
        let record = data.orders.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        record.order.is_paid = true;
        record.order.paid_at = Some(at);
        Ok(record.order.clone())
    }

    async fn set_order_status(
        &self,
        id: OrderId,
        transition: StatusTransition,
        at: DateTime<Utc>,
    ) -> RepoResult<Order> {
        let mut data = self.data.write().await;
        let record = data.orders.get_mut(&id).ok_or(RepositoryError::NotFound)?;
        if record.order.status != transition.from {
            return Err(RepositoryError::Conflict(
                "order status changed since it was read".to_owned(),
            ));
        }
        record.order.status = transition.to;
        if transition.stamps_delivery {
            record.order.delivered_at = Some(at);
        }
        Ok(record.order.clone())
    }
}

#[async_trait]
impl Backend for MemoryStore {
    async fn ping(&self) -> RepoResult<()> {
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use bookshop_core::{Email, OrderStatus, PhoneNumber};
    use rust_decimal::Decimal;

    use super::*;
    use crate::models::NewOrderLine;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    async fn customer(store: &MemoryStore, username: &str) -> User {
        store
            .create_user(NewUser {
                username: username.to_owned(),
                first_name: String::new(),
                last_name: String::new(),
                email: Email::parse(&format!("{username}@example.com")).unwrap(),
                password_hash: "hash".to_owned(),
                is_staff: false,
            })
            .await
            .unwrap()
    }

    async fn book(store: &MemoryStore, title: &str, stock: i32) -> Book {
        store
            .create_book(&Book {
                id: BookId::new(0),
                title: title.to_owned(),
                image: None,
                author_id: None,
                publisher_id: None,
                publication_year: 2001,
                description: String::new(),
                price: dec("100"),
                count_in_stock: stock,
            })
            .await
            .unwrap()
    }

    fn order(customer: UserId, lines: &[(BookId, i32)]) -> NewOrder {
        NewOrder {
            customer_id: customer,
            address: "Lenina 1".to_owned(),
            phone_number: PhoneNumber::parse("+79123456789").unwrap(),
            lines: lines
                .iter()
                .map(|&(book_id, quantity)| NewOrderLine {
                    book_id,
                    quantity,
                    unit_price: dec("100"),
                })
                .collect(),
            shipping_cost: dec("300"),
            total_cost: dec("600"),
            payment_method: "card".to_owned(),
        }
    }

    #[tokio::test]
    async fn test_place_order_decrements_stock() {
        let store = MemoryStore::new();
        let user = customer(&store, "reader").await;
        let a = book(&store, "A", 5).await;
        let b = book(&store, "B", 2).await;

        let detail = store
            .place_order(order(user.id, &[(a.id, 3), (b.id, 2)]))
            .await
            .unwrap();

        assert_eq!(detail.items.len(), 2);
        assert_eq!(detail.order.status, OrderStatus::InProgress);
        assert_eq!(store.get_book(a.id).await.unwrap().unwrap().count_in_stock, 2);
        assert_eq!(store.get_book(b.id).await.unwrap().unwrap().count_in_stock, 0);
    }

    #[tokio::test]
    async fn test_place_order_is_all_or_nothing() {
        let store = MemoryStore::new();
        let user = customer(&store, "reader").await;
        let a = book(&store, "A", 5).await;
        let b = book(&store, "B", 1).await;

        let err = store
            .place_order(order(user.id, &[(a.id, 3), (b.id, 2)]))
            .await
            .unwrap_err();

        assert!(matches!(err, RepositoryError::InsufficientStock(id) if id == b.id));
        assert_eq!(store.get_book(a.id).await.unwrap().unwrap().count_in_stock, 5);
        assert!(store
            .list_orders(OrderScope::customer(user.id))
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_repeated_book_lines_share_stock() {
        let store = MemoryStore::new();
        let user = customer(&store, "reader").await;
        let a = book(&store, "A", 4).await;

        let err = store
            .place_order(order(user.id, &[(a.id, 3), (a.id, 2)]))
            .await
            .unwrap_err();
        assert!(matches!(err, RepositoryError::InsufficientStock(_)));
        assert_eq!(store.get_book(a.id).await.unwrap().unwrap().count_in_stock, 4);
    }

    #[tokio::test]
    async fn test_orders_sort_by_lifecycle_status() {
        let store = MemoryStore::new();
        let user = customer(&store, "reader").await;
        let a = book(&store, "A", 10).await;

        let mut ids = Vec::new();
        for next in [
            OrderStatus::Canceled,
            OrderStatus::Delivered,
            OrderStatus::HandedToCourier,
            OrderStatus::InProgress,
        ] {
            let placed = store.place_order(order(user.id, &[(a.id, 1)])).await.unwrap();
            let transition = OrderStatus::InProgress.transition(next).unwrap();
            store
                .set_order_status(placed.order.id, transition, Utc::now())
                .await
                .unwrap();
            ids.push(placed.order.id);
        }

        let scope = |sort| OrderScope {
            customer_id: None,
            sort,
        };
        let statuses =
            |orders: Vec<Order>| orders.into_iter().map(|o| o.status).collect::<Vec<_>>();

        let ascending = store
            .list_orders(scope(Sort::asc(OrderSortField::Status)))
            .await
            .unwrap();
        assert_eq!(statuses(ascending), OrderStatus::ALL);

        let descending = store
            .list_orders(scope(Sort::desc(OrderSortField::Status)))
            .await
            .unwrap();
        let mut reversed = OrderStatus::ALL;
        reversed.reverse();
        assert_eq!(statuses(descending), reversed);
    }

    #[tokio::test]
    async fn test_stale_status_transition_conflicts() {
        let store = MemoryStore::new();
        let user = customer(&store, "reader").await;
        let a = book(&store, "A", 1).await;
        let placed = store.place_order(order(user.id, &[(a.id, 1)])).await.unwrap();
        let id = placed.order.id;

        let to_courier = OrderStatus::InProgress
            .transition(OrderStatus::HandedToCourier)
            .unwrap();
        store.set_order_status(id, to_courier, Utc::now()).await.unwrap();

        // Planned against the status before the first change.
        let stale = OrderStatus::InProgress.transition(OrderStatus::Canceled).unwrap();
        assert!(matches!(
            store.set_order_status(id, stale, Utc::now()).await,
            Err(RepositoryError::Conflict(_))
        ));
        let current = store.get_order(id).await.unwrap().unwrap();
        assert_eq!(current.order.status, OrderStatus::HandedToCourier);
    }

    #[tokio::test]
    async fn test_duplicate_comment_conflicts() {
        let store = MemoryStore::new();
        let user = customer(&store, "reader").await;
        let a = book(&store, "A", 1).await;
        let review = || NewComment {
            book_id: a.id,
            author_id: user.id,
            rating: Some(Rating::new(4).unwrap()),
            comment: "good".to_owned(),
        };

        let first = store.create_comment(review()).await.unwrap();
        assert_eq!(first.author_username, "reader");
        assert!(matches!(
            store.create_comment(review()).await,
            Err(RepositoryError::Conflict(_))
        ));
        assert_eq!(store.list_comments(a.id).await.unwrap(), vec![first]);
    }

    #[tokio::test]
    async fn test_referenced_book_cannot_be_deleted() {
        let store = MemoryStore::new();
        let user = customer(&store, "reader").await;
        let a = book(&store, "A", 3).await;
        store.place_order(order(user.id, &[(a.id, 1)])).await.unwrap();

        assert!(matches!(
            store.delete_book(a.id).await,
            Err(RepositoryError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn test_list_hides_sold_out_unless_asked() {
        let store = MemoryStore::new();
        book(&store, "In stock", 1).await;
        book(&store, "Sold out", 0).await;

        let public = store.list_books(&BookFilter::default()).await.unwrap();
        assert_eq!(public.len(), 1);
        assert_eq!(public[0].title, "In stock");

        let staff = store
            .list_books(&BookFilter {
                include_out_of_stock: true,
                ..BookFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(staff.len(), 2);
    }
}
