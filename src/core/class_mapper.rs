//! # Class Mapper - 역할 이름 기반 구현체 바인딩
//!
//! 논리적인 역할 이름("user_sprunje", "renderer.json" 등)을 실제 구현체의
//! 생성자에 연결합니다. 나중에 로드된 확장 모듈이 같은 역할에 다른 구현체를
//! 바인딩하면 이후의 모든 조회가 새 구현체를 사용합니다 (last write wins).
//!
//! 역할 이름은 열린 확장 지점이므로 의도적으로 문자열 키를 유지합니다.
//!
//! ```rust,ignore
//! let mapper = ClassMapper::new();
//! mapper.set_mapping("renderer.json", ClassBinding::new::<(), _, _>("JsonRenderer", |_| {
//!     Arc::new(JsonRenderer) as Arc<dyn ResponseRenderer>
//! }));
//!
//! let renderer: Arc<dyn ResponseRenderer> = mapper.create_instance("renderer.json", ())?;
//! ```

use std::any::{Any, type_name};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

use log::debug;

use crate::core::errors::{AppError, AppResult};

type Constructor = Arc<dyn Fn(Box<dyn Any>) -> AppResult<Box<dyn Any + Send + Sync>> + Send + Sync>;

/// 역할에 바인딩되는 생성 가능한 구현체 참조
///
/// 생성자 인자 타입 `A`와 생성물 타입 `T`는 등록 시점에 소거되며,
/// [`ClassMapper::create_instance`] 호출 시 다시 검증됩니다.
#[derive(Clone)]
pub struct ClassBinding {
    implementation: &'static str,
    constructor: Constructor,
}

impl ClassBinding {
    /// 구현체 이름과 생성자로 바인딩을 만듭니다.
    pub fn new<A, T, F>(implementation: &'static str, constructor: F) -> Self
    where
        A: 'static,
        T: Send + Sync + 'static,
        F: Fn(A) -> T + Send + Sync + 'static,
    {
        Self {
            implementation,
            constructor: Arc::new(move |args: Box<dyn Any>| {
                let args = args.downcast::<A>().map_err(|_| AppError::TypeMismatch {
                    name: implementation.to_string(),
                    expected: type_name::<A>(),
                })?;
                let instance: Box<dyn Any + Send + Sync> = Box::new(constructor(*args));
                Ok(instance)
            }),
        }
    }

    /// 바인딩된 구현체 이름
    pub fn implementation(&self) -> &'static str {
        self.implementation
    }

    /// 인자를 전달하여 인스턴스를 생성합니다.
    pub fn instantiate<A: 'static, T: 'static>(&self, args: A) -> AppResult<T> {
        let instance = (self.constructor)(Box::new(args))?;
        instance
            .downcast::<T>()
            .map(|boxed| *boxed)
            .map_err(|_| AppError::TypeMismatch {
                name: self.implementation.to_string(),
                expected: type_name::<T>(),
            })
    }
}

impl fmt::Debug for ClassBinding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassBinding")
            .field("implementation", &self.implementation)
            .finish()
    }
}

/// 역할 → 구현체 매핑 테이블
///
/// 등록 단계에서만 변경되고 이후에는 읽기 전용으로 사용되지만,
/// 내부적으로 `RwLock`으로 보호됩니다.
#[derive(Default)]
pub struct ClassMapper {
    bindings: RwLock<HashMap<String, ClassBinding>>,
}

impl ClassMapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// 역할에 구현체를 바인딩합니다. 기존 바인딩은 대체됩니다.
    pub fn set_mapping(&self, role: &str, binding: ClassBinding) {
        let mut bindings = self.bindings.write().unwrap_or_else(PoisonError::into_inner);
        if let Some(previous) = bindings.get(role) {
            debug!(
                "Class mapping '{}' overridden: {} -> {}",
                role,
                previous.implementation(),
                binding.implementation()
            );
        }
        bindings.insert(role.to_string(), binding);
    }

    /// 역할에 바인딩된 구현체를 반환합니다.
    pub fn get_class(&self, role: &str) -> AppResult<ClassBinding> {
        self.bindings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(role)
            .cloned()
            .ok_or_else(|| AppError::UnknownRole(role.to_string()))
    }

    /// 현재 바인딩된 구현체로 인스턴스를 생성합니다.
    pub fn create_instance<A: 'static, T: 'static>(&self, role: &str, args: A) -> AppResult<T> {
        self.get_class(role)?.instantiate(args)
    }

    pub fn has(&self, role: &str) -> bool {
        self.bindings
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(role)
    }

    /// 바인딩된 역할 이름 목록 (정렬됨)
    pub fn roles(&self) -> Vec<String> {
        let bindings = self.bindings.read().unwrap_or_else(PoisonError::into_inner);
        let mut roles: Vec<String> = bindings.keys().cloned().collect();
        roles.sort();
        roles
    }
}
