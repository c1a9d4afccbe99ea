//! Reference-counted loadable resources.
//!
//! A `Shared<T>` wraps any `DFile` type together with its save name, a
//! dirty flag and the time it was last saved. Resources that are named
//! and clean can be entered in a `Registry` so that other parts of a
//! session find and reuse the same object instead of loading another
//! copy. The registry only holds weak references: a resource leaves it
//! when its last owner releases it, or as soon as it is edited.

use chrono::{DateTime, Utc};
use std::cell::{Ref, RefCell, RefMut};
use std::collections::HashMap;
use std::io::{Read, Write};
use std::rc::{Rc, Weak};

use crate::io::SizeCounter;
use crate::Result;

/// A type that can be loaded from and saved to a byte stream.
pub trait DFile: Sized {
    fn read_from<R: Read>(reader: R) -> Result<Self>;

    fn write_to<W: Write>(&self, writer: W) -> Result<()>;

    /// Exact encoded size, if known without encoding.
    fn min_size_hint(&self) -> Option<u64> {
        None
    }

    /// Called when the last reference is released, unless the resource
    /// was given its own destructor.
    fn destroy(&mut self) {}
}

type Cell<T> = RefCell<Resource<T>>;
type Table<T> = RefCell<HashMap<String, Weak<Cell<T>>>>;

/// Name to resource lookup, owned by whoever owns the session.
pub struct Registry<T: DFile> {
    table: Rc<Table<T>>,
}

impl<T: DFile> Default for Registry<T> {
    fn default() -> Self {
        Self {
            table: Rc::new(RefCell::new(HashMap::new())),
        }
    }
}

impl<T: DFile> Clone for Registry<T> {
    fn clone(&self) -> Self {
        Self {
            table: Rc::clone(&self.table),
        }
    }
}

impl<T: DFile> Registry<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live registered resources.
    pub fn len(&self) -> usize {
        self.table
            .borrow()
            .values()
            .filter(|w| w.strong_count() > 0)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, name: &str) -> bool {
        self.table
            .borrow()
            .get(name)
            .is_some_and(|w| w.strong_count() > 0)
    }
}

struct Resource<T: DFile> {
    data: T,
    name: Option<String>,
    dirty: bool,
    saved_at: Option<DateTime<Utc>>,
    registry: Option<Weak<Table<T>>>,
    destructor: Option<Box<dyn FnOnce(&mut T)>>,
}

impl<T: DFile> Resource<T> {
    fn unregister(&mut self) {
        let (Some(registry), Some(name)) = (self.registry.take(), self.name.as_deref()) else {
            return;
        };
        let Some(table) = registry.upgrade() else {
            return;
        };
        // A resource being dropped cannot be upgraded any more, so only
        // entries that still point at a live object survive.
        let Ok(mut table) = table.try_borrow_mut() else {
            return;
        };
        if table.get(name).is_some_and(|w| w.strong_count() == 0 || self.is_entry(w)) {
            table.remove(name);
            log::trace!("unregistered shared resource {name}");
        }
    }

    fn is_entry(&self, weak: &Weak<Cell<T>>) -> bool {
        weak.upgrade()
            .is_some_and(|rc| std::ptr::eq(rc.as_ptr() as *const Resource<T>, self))
    }
}

impl<T: DFile> Drop for Resource<T> {
    fn drop(&mut self) {
        match self.destructor.take() {
            Some(destructor) => destructor(&mut self.data),
            None => self.data.destroy(),
        }
        self.unregister();
    }
}

/// A claimed reference to a resource. Cloning claims it again; dropping
/// releases it.
pub struct Shared<T: DFile> {
    inner: Rc<Cell<T>>,
}

impl<T: DFile> Clone for Shared<T> {
    fn clone(&self) -> Self {
        self.claim()
    }
}

impl<T: DFile> Shared<T> {
    pub fn new(data: T) -> Self {
        Self::build(data, None)
    }

    /// Like `new`, but `destructor` runs in place of `DFile::destroy`.
    pub fn with_destructor(data: T, destructor: impl FnOnce(&mut T) + 'static) -> Self {
        Self::build(data, Some(Box::new(destructor)))
    }

    fn build(data: T, destructor: Option<Box<dyn FnOnce(&mut T)>>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Resource {
                data,
                name: None,
                dirty: false,
                saved_at: None,
                registry: None,
                destructor,
            })),
        }
    }

    /// Loads a new, unnamed resource.
    pub fn read_from<R: Read>(reader: R) -> Result<Self> {
        Ok(Self::new(T::read_from(reader)?))
    }

    pub fn write_to<W: Write>(&self, writer: W) -> Result<()> {
        self.inner.borrow().data.write_to(writer)
    }

    /// Encoded size, found by writing to a counting sink when the type
    /// cannot say directly.
    pub fn min_size(&self) -> Result<u64> {
        let res = self.inner.borrow();
        if let Some(n) = res.data.min_size_hint() {
            return Ok(n);
        }
        let mut counter = SizeCounter::default();
        res.data.write_to(&mut counter)?;
        Ok(counter.count())
    }

    pub fn claim(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }

    pub fn release(self) {}

    pub fn ref_count(&self) -> usize {
        Rc::strong_count(&self.inner)
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub fn get(&self) -> Ref<'_, T> {
        Ref::map(self.inner.borrow(), |r| &r.data)
    }

    /// Mutable access. The resource becomes dirty and leaves its
    /// registry, since it no longer matches what was saved under its name.
    pub fn edit(&self) -> RefMut<'_, T> {
        let mut res = self.inner.borrow_mut();
        res.dirty = true;
        res.unregister();
        RefMut::map(res, |r| &mut r.data)
    }

    pub fn name(&self) -> Option<String> {
        self.inner.borrow().name.clone()
    }

    pub fn is_dirty(&self) -> bool {
        self.inner.borrow().dirty
    }

    pub fn saved_at(&self) -> Option<DateTime<Utc>> {
        self.inner.borrow().saved_at
    }

    pub fn is_shared(&self) -> bool {
        self.inner
            .borrow()
            .registry
            .as_ref()
            .is_some_and(|r| r.strong_count() > 0)
    }

    /// Records that the resource was loaded from or saved to `name`.
    ///
    /// # Panics
    /// If the resource is registered under a different name.
    pub fn set_saved(&self, name: &str, at: DateTime<Utc>) {
        let mut res = self.inner.borrow_mut();
        let registered = res.registry.as_ref().is_some_and(|r| r.strong_count() > 0);
        assert!(
            !registered || res.name.as_deref() == Some(name),
            "shared resource renamed while registered"
        );
        res.name = Some(name.to_string());
        res.dirty = false;
        res.saved_at = Some(at);
    }

    /// Enters the resource in `registry` under its name. Returns false if
    /// another live resource already holds that name.
    ///
    /// # Panics
    /// If the resource has no name or has unsaved changes.
    pub fn set_shared(&self, registry: &Registry<T>) -> bool {
        let mut res = self.inner.borrow_mut();
        let Some(name) = res.name.clone() else {
            panic!("only named resources can be shared");
        };
        assert!(!res.dirty, "only clean resources can be shared");

        {
            let mut table = registry.table.borrow_mut();
            if let Some(existing) = table.get(&name) {
                if Weak::ptr_eq(existing, &Rc::downgrade(&self.inner)) {
                    return true;
                }
                if existing.strong_count() > 0 {
                    log::debug!("shared resource name {name} already taken");
                    return false;
                }
            }
            if table.try_reserve(1).is_err() {
                return false;
            }
            table.insert(name.clone(), Rc::downgrade(&self.inner));
        }
        res.registry = Some(Rc::downgrade(&registry.table));
        log::trace!("registered shared resource {name}");
        true
    }

    /// Claims the resource registered under `name`, if any.
    pub fn find_shared(registry: &Registry<T>, name: &str) -> Option<Self> {
        let inner = registry.table.borrow().get(name)?.upgrade()?;
        Some(Self { inner })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, PartialEq)]
    struct Blob(Vec<u8>);

    impl DFile for Blob {
        fn read_from<R: Read>(mut reader: R) -> Result<Self> {
            let mut buf = Vec::new();
            reader
                .read_to_end(&mut buf)
                .map_err(crate::MissionError::ReadFail)?;
            Ok(Self(buf))
        }

        fn write_to<W: Write>(&self, mut writer: W) -> Result<()> {
            writer
                .write_all(&self.0)
                .map_err(crate::MissionError::WriteFail)
        }
    }

    fn saved(bytes: &[u8], name: &str) -> Shared<Blob> {
        let res = Shared::read_from(bytes).unwrap();
        res.set_saved(name, Utc::now());
        res
    }

    #[test]
    fn claim_and_release_count_references() {
        let a = Shared::new(Blob::default());
        assert_eq!(a.ref_count(), 1);
        let b = a.claim();
        assert_eq!(a.ref_count(), 2);
        b.release();
        assert_eq!(a.ref_count(), 1);
    }

    #[test]
    fn find_shared_claims() {
        let registry = Registry::new();
        let a = saved(b"abc", "one.bin");
        assert!(a.set_shared(&registry));
        assert!(a.set_shared(&registry));

        let found = Shared::find_shared(&registry, "one.bin").unwrap();
        assert!(found.ptr_eq(&a));
        assert_eq!(a.ref_count(), 2);
        assert!(Shared::find_shared(&registry, "two.bin").is_none());
    }

    #[test]
    fn duplicate_names_are_refused() {
        let registry = Registry::new();
        let a = saved(b"a", "same");
        let b = saved(b"b", "same");
        assert!(a.set_shared(&registry));
        assert!(!b.set_shared(&registry));
        assert!(!b.is_shared());

        drop(a);
        assert!(registry.is_empty());
        assert!(b.set_shared(&registry));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn release_unregisters_and_runs_destructor() {
        let registry = Registry::new();
        let ran = Rc::new(RefCell::new(false));
        let flag = Rc::clone(&ran);
        let res = Shared::with_destructor(Blob(vec![1]), move |_| *flag.borrow_mut() = true);
        res.set_saved("x", Utc::now());
        assert!(res.set_shared(&registry));

        res.release();
        assert!(*ran.borrow());
        assert!(!registry.contains("x"));
    }

    #[test]
    fn editing_unregisters() {
        let registry = Registry::new();
        let res = saved(b"abc", "edit.bin");
        assert!(res.set_shared(&registry));
        res.edit().0.push(b'd');
        assert!(res.is_dirty());
        assert!(!registry.contains("edit.bin"));
        assert!(Shared::find_shared(&registry, "edit.bin").is_none());
    }

    #[test]
    #[should_panic(expected = "renamed while registered")]
    fn renaming_registered_resource_panics() {
        let registry = Registry::new();
        let res = saved(b"", "first");
        res.set_shared(&registry);
        res.set_saved("second", Utc::now());
    }

    #[test]
    fn min_size_writes_to_counter() {
        let res = Shared::new(Blob(vec![0; 37]));
        assert_eq!(res.min_size().unwrap(), 37);
    }
}
