use proc_macro::TokenStream;
use quote::quote;
use syn::{DataStruct, DeriveInput, Field, Fields, GenericArgument, LitStr, PathArguments, Result, Type};

const ID_FIELD: &str = "id";
const LIST_SUFFIX: &str = "_list";
const SCALAR_TYPES: &[&str] = &["i32", "i64", "f32", "f64", "bool", "String"];

#[derive(Default)]
struct FieldOptions {
    skip: bool,
    column: bool,
    required: bool,
}

enum Persisted<'a> {
    Id(&'a Field),
    Scalar(&'a Field, bool),
    List(&'a Field, &'a Type, &'a syn::Expr),
    Skipped(&'a Field),
}

fn field_options(field: &Field) -> Result<FieldOptions> {
    let mut options = FieldOptions::default();
    for attr in &field.attrs {
        if attr.path().is_ident("entity") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("skip") {
                    options.skip = true;
                    Ok(())
                } else if meta.path.is_ident("column") {
                    options.column = true;
                    Ok(())
                } else if meta.path.is_ident("required") {
                    options.required = true;
                    Ok(())
                } else {
                    Err(meta.error("Unknown entity field attribute"))
                }
            })?;
        }
    }
    if options.skip && (options.column || options.required) {
        return Err(syn::Error::new_spanned(
            field,
            "A skipped field cannot also be a column",
        ));
    }
    Ok(options)
}

/// Last path segment name, e.g. `String` for `std::string::String`.
fn type_name(ty: &Type) -> Option<String> {
    match ty {
        Type::Path(path) if path.qself.is_none() => {
            path.path.segments.last().map(|seg| seg.ident.to_string())
        }
        _ => None,
    }
}

fn single_type_arg(ty: &Type) -> Option<&Type> {
    let Type::Path(path) = ty else { return None };
    let segment = path.path.segments.last()?;
    let PathArguments::AngleBracketed(args) = &segment.arguments else {
        return None;
    };
    match args.args.first() {
        Some(GenericArgument::Type(inner)) if args.args.len() == 1 => Some(inner),
        _ => None,
    }
}

fn is_scalar(ty: &Type) -> bool {
    match type_name(ty).as_deref() {
        Some(name) if SCALAR_TYPES.contains(&name) => true,
        Some("Vec") => single_type_arg(ty).and_then(type_name).as_deref() == Some("u8"),
        Some("Option") => single_type_arg(ty).is_some_and(|inner| {
            type_name(inner).as_deref() != Some("Option") && is_scalar(inner)
        }),
        _ => false,
    }
}

fn classify<'a>(field: &'a Field, options: &FieldOptions) -> Result<Persisted<'a>> {
    let ident = field
        .ident
        .as_ref()
        .ok_or_else(|| syn::Error::new_spanned(field, "Entity fields must be named"))?;
    let name = ident.to_string();

    if options.skip {
        return Ok(Persisted::Skipped(field));
    }
    if name == ID_FIELD {
        return Ok(Persisted::Id(field));
    }

    if let Type::Array(array) = &field.ty {
        if name.ends_with(LIST_SUFFIX) && name.len() > LIST_SUFFIX.len() {
            if is_scalar(&array.elem) || options.column {
                return Ok(Persisted::List(field, &array.elem, &array.len));
            }
        } else if options.column {
            return Err(syn::Error::new_spanned(
                field,
                format!("List field '{}' must end with '{}'", name, LIST_SUFFIX),
            ));
        }
    } else if is_scalar(&field.ty) || options.column {
        return Ok(Persisted::Scalar(field, options.required));
    }

    // Anything else is left out of the row in both directions.
    Ok(Persisted::Skipped(field))
}

pub(crate) fn generate_entity_for_struct(ast: &DeriveInput, data: &DataStruct) -> Result<TokenStream> {
    let name = &ast.ident;
    if !ast.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &ast.generics,
            "Generic entities are not supported",
        ));
    }

    let mut entity_name = name.to_string();
    for attr in &ast.attrs {
        if attr.path().is_ident("entity") {
            attr.parse_nested_meta(|meta| {
                if meta.path.is_ident("name") {
                    let value = meta.value()?;
                    let s: LitStr = value.parse()?;
                    entity_name = s.value();
                    Ok(())
                } else {
                    Err(meta.error("Unknown entity attribute"))
                }
            })?;
        }
    }

    let Fields::Named(named) = &data.fields else {
        return Err(syn::Error::new_spanned(ast, "Only structs with named fields are supported"));
    };

    let mut persisted = Vec::with_capacity(named.named.len());
    for field in &named.named {
        let options = field_options(field)?;
        persisted.push(classify(field, &options)?);
    }

    if !persisted.iter().any(|p| matches!(p, Persisted::Id(_))) {
        return Err(syn::Error::new_spanned(
            ast,
            format!("Entity '{}' has no '{}' field", entity_name, ID_FIELD),
        ));
    }

    let mut seen_list = false;
    for p in &persisted {
        match p {
            Persisted::List(..) => seen_list = true,
            Persisted::Id(field) | Persisted::Scalar(field, _) if seen_list => {
                return Err(syn::Error::new_spanned(
                    field,
                    "Scalar fields must come before list fields",
                ));
            }
            _ => {}
        }
    }

    let mut descriptors = Vec::new();
    let mut skipped = Vec::new();
    let mut puts = Vec::new();
    let mut reads = Vec::new();

    for p in &persisted {
        match p {
            Persisted::Id(field) => {
                let ident = &field.ident;
                descriptors.push(quote! { rowshape::mapper::FieldDescriptor::id() });
                puts.push(quote! { record.put(#ID_FIELD, self.#ident.clone()); });
                reads.push(quote! { #ident: record.get_as(#ID_FIELD)? });
            }
            Persisted::Scalar(field, required) => {
                let ident = &field.ident;
                let ty = &field.ty;
                let column = ident.as_ref().map(|i| i.to_string()).unwrap_or_default();
                let default = if *required {
                    quote! { None }
                } else {
                    quote! {
                        Some(if <#ty as rowshape::mapper::FieldType>::NULLABLE {
                            rowshape::common::Value::Null
                        } else {
                            <#ty as rowshape::mapper::FieldType>::KIND.default_value()
                        })
                    }
                };
                descriptors.push(quote! {
                    rowshape::mapper::FieldDescriptor::from_parts(
                        #column,
                        <#ty as rowshape::mapper::FieldType>::KIND,
                        <#ty as rowshape::mapper::FieldType>::NULLABLE,
                        #default,
                        None,
                    )
                });
                puts.push(quote! { record.put(#column, self.#ident.clone()); });
                reads.push(quote! { #ident: record.get_as(#column)? });
            }
            Persisted::List(field, elem, len) => {
                let ident = &field.ident;
                let column = ident.as_ref().map(|i| i.to_string()).unwrap_or_default();
                descriptors.push(quote! {
                    rowshape::mapper::FieldDescriptor::from_parts(
                        #column,
                        <#elem as rowshape::mapper::FieldType>::KIND,
                        false,
                        Some(rowshape::common::Value::List(
                            (0..(#len))
                                .map(|_| <#elem as rowshape::mapper::FieldType>::KIND.default_value())
                                .collect(),
                        )),
                        Some(#len),
                    )
                });
                puts.push(quote! {
                    record.put(
                        #column,
                        rowshape::common::Value::List(
                            self.#ident.iter().cloned().map(rowshape::common::Value::from).collect(),
                        ),
                    );
                });
                reads.push(quote! { #ident: record.get_list_as(#column)? });
            }
            Persisted::Skipped(field) => {
                let ident = &field.ident;
                let column = ident.as_ref().map(|i| i.to_string()).unwrap_or_default();
                skipped.push(quote! { #column.to_string() });
                reads.push(quote! { #ident: ::core::default::Default::default() });
            }
        }
    }

    let gen = quote! {
        impl rowshape::mapper::Entity for #name {
            fn descriptor() -> &'static rowshape::mapper::EntityDescriptor {
                static DESCRIPTOR: ::std::sync::OnceLock<rowshape::mapper::EntityDescriptor> =
                    ::std::sync::OnceLock::new();
                DESCRIPTOR.get_or_init(|| {
                    rowshape::mapper::EntityDescriptor::from_parts(
                        #entity_name,
                        vec![#(#descriptors),*],
                        vec![#(#skipped),*],
                    )
                })
            }

            fn to_record(&self) -> rowshape::mapper::Record {
                let mut record = rowshape::mapper::Record::new();
                #(#puts)*
                record
            }

            fn from_record(
                record: &rowshape::mapper::Record,
            ) -> rowshape::errors::RowshapeResult<Self> {
                Ok(#name {
                    #(#reads),*
                })
            }
        }
    };

    Ok(TokenStream::from(gen))
}
