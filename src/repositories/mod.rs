//! Uniform persistence contract over the storefront entities.
//!
//! [`Repository`] is stateless: every method takes the connection to run on, so
//! the same repository works against the pool or inside a transaction.

use sea_orm::{
    ActiveModelBehavior, ActiveModelTrait, Condition, ConnectionTrait, DbErr, EntityTrait,
    IntoActiveModel, Iterable, PrimaryKeyToColumn, PrimaryKeyTrait, QueryFilter, QueryOrder,
    QuerySelect, Select,
};
use std::marker::PhantomData;

use crate::entities::{CartLine, OrderLine, Product, User};

pub type UserRepository = Repository<User>;
pub type ProductRepository = Repository<Product>;
pub type CartLineRepository = Repository<CartLine>;
pub type OrderLineRepository = Repository<OrderLine>;

/// Create/find/list/delete for one entity type
#[derive(Debug)]
pub struct Repository<E> {
    _entity: PhantomData<fn() -> E>,
}

impl<E> Default for Repository<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> Clone for Repository<E> {
    fn clone(&self) -> Self {
        Self::new()
    }
}

impl<E> Repository<E> {
    pub const fn new() -> Self {
        Self {
            _entity: PhantomData,
        }
    }
}

impl<E> Repository<E>
where
    E: EntityTrait,
    E::Model: IntoActiveModel<E::ActiveModel>,
    E::ActiveModel: ActiveModelBehavior + Send,
{
    /// Persists a new row and returns it with its assigned id
    pub async fn insert<C>(&self, db: &C, model: E::ActiveModel) -> Result<E::Model, DbErr>
    where
        C: ConnectionTrait,
    {
        model.insert(db).await
    }

    pub async fn find_by_id<C>(
        &self,
        db: &C,
        id: <E::PrimaryKey as PrimaryKeyTrait>::ValueType,
    ) -> Result<Option<E::Model>, DbErr>
    where
        C: ConnectionTrait,
    {
        E::find_by_id(id).one(db).await
    }

    pub async fn find_one<C>(&self, db: &C, filter: Condition) -> Result<Option<E::Model>, DbErr>
    where
        C: ConnectionTrait,
    {
        E::find().filter(filter).one(db).await
    }

    /// All rows matching `filter`, ascending by primary key
    pub async fn list<C>(&self, db: &C, filter: Condition) -> Result<Vec<E::Model>, DbErr>
    where
        C: ConnectionTrait,
    {
        Self::ordered(E::find().filter(filter)).all(db).await
    }

    /// Like [`Repository::list`] but takes exclusive row locks where the
    /// backend supports `SELECT ... FOR UPDATE`. Only meaningful inside a
    /// transaction.
    pub async fn list_for_update<C>(&self, db: &C, filter: Condition) -> Result<Vec<E::Model>, DbErr>
    where
        C: ConnectionTrait,
    {
        Self::ordered(E::find().filter(filter))
            .lock_exclusive()
            .all(db)
            .await
    }

    /// Deletes every row matching `filter` and reports how many went away
    pub async fn delete_many<C>(&self, db: &C, filter: Condition) -> Result<u64, DbErr>
    where
        C: ConnectionTrait,
    {
        let result = E::delete_many().filter(filter).exec(db).await?;
        Ok(result.rows_affected)
    }

    fn ordered(mut select: Select<E>) -> Select<E> {
        for key in E::PrimaryKey::iter() {
            select = select.order_by_asc(key.into_column());
        }
        select
    }
}
