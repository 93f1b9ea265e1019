//! One module per rental site. Shared layouts live in `busca`, `imovel_box`
//! and `anuncios_api`.

mod anuncios_api;
mod busca;
mod credito_real;
mod dalton;
mod duda;
mod f1;
mod floripa_imob;
mod ibagy;
mod imovel_box;
mod lideranca;
mod olx;
mod quadra;
mod realizar;
mod regente;
mod seiter;

pub use anuncios_api::{Gralha, Sanremo};
pub use credito_real::CreditoReal;
pub use dalton::DaltonAndrade;
pub use duda::Duda;
pub use f1::F1;
pub use floripa_imob::FloripaImob;
pub use ibagy::Ibagy;
pub use lideranca::Lideranca;
pub use olx::Olx;
pub use quadra::Quadra;
pub use realizar::Realizar;
pub use regente::Regente;
pub use seiter::Seiter;
