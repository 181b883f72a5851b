mod component;
mod event;
mod tag;

use proc_macro::TokenStream;

#[proc_macro_derive(Component)]
pub fn derive_component(item: TokenStream) -> TokenStream {
    component::derive_component(item)
}

#[proc_macro_derive(Tag)]
pub fn derive_tag(item: TokenStream) -> TokenStream {
    tag::derive_tag(item)
}

#[proc_macro_derive(Event)]
pub fn derive_event(item: TokenStream) -> TokenStream {
    event::derive_event(item)
}
