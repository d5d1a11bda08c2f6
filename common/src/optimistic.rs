//! 楽観的更新とロールバック
//!
//! 変更を先に反映し、永続化に失敗したら変更前のスナップショットへ戻す。
//! rollback は apply の厳密な逆操作になる。

/// 適用済みの楽観的変更
#[derive(Debug)]
#[must_use = "commit か rollback で確定させる"]
pub struct Mutation<T: Clone> {
    previous: T,
}

impl<T: Clone> Mutation<T> {
    /// スナップショットを取ってから変更を適用
    pub fn apply<F>(target: &mut T, change: F) -> Self
    where
        F: FnOnce(&mut T),
    {
        let previous = target.clone();
        change(target);
        Self { previous }
    }

    pub fn previous(&self) -> &T {
        &self.previous
    }

    /// 変更を確定
    pub fn commit(self) {}

    /// 変更前に戻す
    pub fn rollback(self, target: &mut T) {
        *target = self.previous;
    }
}

/// 適用 → 永続化 → 失敗時ロールバック
pub fn apply_then_persist<T, E, F, P>(target: &mut T, change: F, persist: P) -> Result<(), E>
where
    T: Clone,
    F: FnOnce(&mut T),
    P: FnOnce(&T) -> Result<(), E>,
{
    let mutation = Mutation::apply(target, change);
    match persist(target) {
        Ok(()) => {
            mutation.commit();
            Ok(())
        }
        Err(e) => {
            mutation.rollback(target);
            Err(e)
        }
    }
}
